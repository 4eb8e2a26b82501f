// src/services/identity/credentials.rs
//! Service-account credentials: custom-token signing and OAuth2 access tokens
//! for the provider's admin endpoints.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::{Claims, IdentityError};

/// Audience every custom token must carry
pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Custom tokens are accepted for at most one hour after issue
pub const CUSTOM_TOKEN_LIFETIME_SECS: i64 = 3600;

const ADMIN_SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
https://www.googleapis.com/auth/firebase \
https://www.googleapis.com/auth/identitytoolkit \
https://www.googleapis.com/auth/userinfo.email";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Access tokens are refreshed this long before they expire
const ACCESS_TOKEN_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read service account file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("service account file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("service account private key is not a valid RSA PEM: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

/// Fields of a Google service-account key file that this service uses
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccount {
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Payload of a custom token
#[derive(Debug, Serialize, Deserialize)]
pub struct CustomTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Claims::is_empty")]
    pub claims: Claims,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Signs with the service-account key. The key is parsed once at
/// construction, so signing itself does not touch the network.
pub struct ServiceAccountSigner {
    account: ServiceAccount,
    key: EncodingKey,
    access_token: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for ServiceAccountSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountSigner")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountSigner {
    pub fn new(account: ServiceAccount) -> Result<Self, CredentialsError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;
        info!(
            project_id = %account.project_id,
            client_email = %account.client_email,
            "Service account loaded"
        );
        Ok(Self {
            account,
            key,
            access_token: Mutex::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    fn header(&self) -> Header {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();
        header
    }

    /// Mint a custom token for `uid` carrying `claims`
    pub fn custom_token(&self, uid: &str, claims: &Claims) -> Result<String, IdentityError> {
        let iat = Utc::now().timestamp();
        let payload = CustomTokenClaims {
            iss: self.account.client_email.clone(),
            sub: self.account.client_email.clone(),
            aud: CUSTOM_TOKEN_AUDIENCE.to_string(),
            iat,
            exp: iat + CUSTOM_TOKEN_LIFETIME_SECS,
            uid: uid.to_string(),
            claims: claims.clone(),
        };

        encode(&self.header(), &payload, &self.key).map_err(|e| {
            error!(error = %e, "Failed to sign custom token");
            IdentityError::Signing(e.to_string())
        })
    }

    /// Bearer token for admin endpoints, fetched with the JWT-bearer grant
    /// and reused until shortly before it expires.
    pub async fn access_token(&self, http: &Client) -> Result<String, IdentityError> {
        let mut cached = self.access_token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(ACCESS_TOKEN_MARGIN_SECS) > now {
                return Ok(token.token.clone());
            }
        }

        let iat = now.timestamp();
        let assertion_claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: ADMIN_SCOPES,
            aud: &self.account.token_uri,
            iat,
            exp: iat + 3600,
        };
        let assertion = encode(&self.header(), &assertion_claims, &self.key)
            .map_err(|e| IdentityError::Signing(e.to_string()))?;

        debug!(token_uri = %self.account.token_uri, "Requesting admin access token");

        let response = http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error contacting OAuth token endpoint");
                IdentityError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(http_status = %status, body = %body, "OAuth token endpoint rejected assertion");
            return Err(IdentityError::Signing(format!(
                "access token request failed with status {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Malformed OAuth token response");
            IdentityError::Unavailable(e.to_string())
        })?;

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: now + Duration::seconds(token.expires_in),
        });

        Ok(token.access_token)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::services::identity::user_claims;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};

    #[test]
    fn test_service_account_parsing() {
        let json = serde_json::json!({
            "type": "service_account",
            "project_id": "blog-test",
            "private_key_id": "abc",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": "sa@blog-test.iam.gserviceaccount.com",
            "client_id": "1234"
        });

        let account: ServiceAccount = serde_json::from_value(json).unwrap();
        assert_eq!(account.project_id, "blog-test");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
        assert!(!format!("{:?}", account).contains("PRIVATE KEY"));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut account = test_account(DEFAULT_TOKEN_URI);
        account.private_key = "not a key".to_string();
        assert!(matches!(
            ServiceAccountSigner::new(account),
            Err(CredentialsError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ServiceAccount::from_file(Path::new("/nonexistent/sa.json")).unwrap_err();
        assert!(matches!(err, CredentialsError::Read { .. }));
    }

    #[test]
    fn test_custom_token_contents() {
        let signer = ServiceAccountSigner::new(test_account(DEFAULT_TOKEN_URI)).unwrap();
        let token = signer.custom_token("uid-42", &user_claims()).unwrap();

        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("test-key-1"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[CUSTOM_TOKEN_AUDIENCE]);
        let decoded = decode::<CustomTokenClaims>(
            &token,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        let claims = decoded.claims;
        assert_eq!(claims.uid, "uid-42");
        assert_eq!(claims.iss, "firebase-adminsdk@blog-test.iam.gserviceaccount.com");
        assert_eq!(claims.sub, claims.iss);
        assert_eq!(claims.exp - claims.iat, CUSTOM_TOKEN_LIFETIME_SECS);
        assert_eq!(claims.claims, user_claims());
    }
}
