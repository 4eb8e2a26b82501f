// src/common/config.rs
//! Process configuration loaded from the environment at startup

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::blog::models::UserIdMatch;
use crate::services::blob_log::WriteMode;

pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_POSTS_KEY: &str = "posts";
pub const DEFAULT_FAILURE_BACKOFF_MS: u64 = 3000;
pub const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("env var {0} is missing.")]
    Missing(&'static str),

    #[error("env var {name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub firebase_api_key: String,
    pub data_bucket: String,
    pub service_account_path: PathBuf,
    pub identity_toolkit_url: String,
    pub storage_endpoint: String,
    pub storage_region: String,
    pub posts_key: String,
    /// Delay applied before a failed credential or token-exchange check is reported
    pub failure_backoff: Duration,
    pub outbound_timeout: Duration,
    pub user_id_match: UserIdMatch,
    pub write_mode: WriteMode,
    pub cors_origins: Vec<String>,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let firebase_api_key = required("FIREBASE_API_KEY")?;
        let data_bucket = required("GCS_DATA_BUCKET")?;
        let service_account_path = PathBuf::from(required("GOOGLE_APPLICATION_CREDENTIALS")?);

        let failure_backoff = Duration::from_millis(parse_number(
            "IDENTITY_FAILURE_BACKOFF_MS",
            lookup("IDENTITY_FAILURE_BACKOFF_MS"),
            DEFAULT_FAILURE_BACKOFF_MS,
        )?);
        let outbound_timeout = Duration::from_secs(parse_number(
            "OUTBOUND_TIMEOUT_SECS",
            lookup("OUTBOUND_TIMEOUT_SECS"),
            DEFAULT_OUTBOUND_TIMEOUT_SECS,
        )?);
        if outbound_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "OUTBOUND_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }

        let user_id_match = optional("USER_ID_MATCH", "contains");
        let user_id_match =
            user_id_match
                .parse::<UserIdMatch>()
                .map_err(|reason| ConfigError::Invalid {
                    name: "USER_ID_MATCH",
                    value: user_id_match.clone(),
                    reason,
                })?;

        let write_mode = optional("BLOB_LOG_WRITE_MODE", "overwrite");
        let write_mode = write_mode
            .parse::<WriteMode>()
            .map_err(|reason| ConfigError::Invalid {
                name: "BLOB_LOG_WRITE_MODE",
                value: write_mode.clone(),
                reason,
            })?;

        let cors_origins = optional(
            "CORS_ORIGINS",
            "http://localhost:3000,http://localhost:5173",
        )
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

        let port = parse_number("PORT", lookup("PORT"), 8080u16)?;

        Ok(Self {
            firebase_api_key,
            data_bucket,
            service_account_path,
            identity_toolkit_url: optional("IDENTITY_TOOLKIT_URL", DEFAULT_IDENTITY_TOOLKIT_URL)
                .trim_end_matches('/')
                .to_string(),
            storage_endpoint: optional("STORAGE_ENDPOINT", DEFAULT_STORAGE_ENDPOINT),
            storage_region: optional("STORAGE_REGION", "auto"),
            posts_key: optional("POSTS_KEY", DEFAULT_POSTS_KEY),
            failure_backoff,
            outbound_timeout,
            user_id_match,
            write_mode,
            cors_origins,
            port,
        })
    }
}

fn parse_number<N>(name: &'static str, raw: Option<String>, default: N) -> Result<N, ConfigError>
where
    N: std::str::FromStr,
    N::Err: std::fmt::Display,
{
    match raw.filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(value) => value.trim().parse::<N>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("FIREBASE_API_KEY", "api-key"),
        ("GCS_DATA_BUCKET", "blog-data"),
        ("GOOGLE_APPLICATION_CREDENTIALS", "/secrets/sa.json"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(REQUIRED)).unwrap();

        assert_eq!(config.firebase_api_key, "api-key");
        assert_eq!(config.data_bucket, "blog-data");
        assert_eq!(config.identity_toolkit_url, DEFAULT_IDENTITY_TOOLKIT_URL);
        assert_eq!(config.posts_key, "posts");
        assert_eq!(config.failure_backoff, Duration::from_secs(3));
        assert_eq!(config.outbound_timeout, Duration::from_secs(10));
        assert_eq!(config.user_id_match, UserIdMatch::Contains);
        assert_eq!(config.write_mode, WriteMode::Overwrite);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_required_variable() {
        for (missing, _) in REQUIRED {
            let pairs: Vec<(&str, &str)> = REQUIRED
                .iter()
                .copied()
                .filter(|(name, _)| name != missing)
                .collect();
            let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(name) if name == *missing));
        }
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("IDENTITY_TOOLKIT_URL", "http://127.0.0.1:9099/v1/"),
            ("IDENTITY_FAILURE_BACKOFF_MS", "250"),
            ("USER_ID_MATCH", "exact"),
            ("BLOB_LOG_WRITE_MODE", "conditional"),
            ("CORS_ORIGINS", "https://blog.example.com, ,https://admin.example.com"),
            ("PORT", "9000"),
        ]);
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.identity_toolkit_url, "http://127.0.0.1:9099/v1");
        assert_eq!(config.failure_backoff, Duration::from_millis(250));
        assert_eq!(config.user_id_match, UserIdMatch::Exact);
        assert_eq!(config.write_mode, WriteMode::Conditional);
        assert_eq!(
            config.cors_origins,
            vec!["https://blog.example.com", "https://admin.example.com"]
        );
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("USER_ID_MATCH", "prefix"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "USER_ID_MATCH", .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("OUTBOUND_TIMEOUT_SECS", "0"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "OUTBOUND_TIMEOUT_SECS", .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "http"));
        let err = AppConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}
