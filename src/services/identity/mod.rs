//! # Identity delegate
//!
//! Account operations are forwarded to an external identity provider
//! (Firebase Authentication). This module defines the provider-neutral
//! surface used by the request handlers:
//! - `IdentityProvider` trait with one method per delegated operation
//! - result types for accounts, provider sessions and verified identities
//! - `IdentityError`, the failure taxonomy mapped onto HTTP statuses

pub mod credentials;
pub mod firebase;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use credentials::{ServiceAccount, ServiceAccountSigner};
pub use firebase::FirebaseIdentity;

/// Claim name to claim value
pub type Claims = Map<String, Value>;

/// Profile claim embedded in every custom token this service mints
pub const PROFILE_CLAIM: &str = "profile";
pub const USER_PROFILE: &str = "user";

/// The fixed claim set `{"profile": "user"}`
pub fn user_claims() -> Claims {
    let mut claims = Claims::new();
    claims.insert(
        PROFILE_CLAIM.to_string(),
        Value::String(USER_PROFILE.to_string()),
    );
    claims
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("wrong login or password.")]
    InvalidCredentials,

    #[error("error during sign custom token, token expired ?")]
    TokenExchangeFailed,

    #[error("JWT token is not valid")]
    InvalidToken,

    #[error("The user with the provided email already exists (EMAIL_EXISTS).")]
    AccountAlreadyExists(String),

    #[error("account creation failed: {0}")]
    CreateFailed(String),

    #[error("account update failed: {0}")]
    UpdateFailed(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// An account as reported by the provider
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    pub account_id: String,
    pub email: String,
}

/// Tokens returned when a custom token is exchanged
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<String>,
}

/// Identity established from a provider-validated ID token
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub email: String,
    pub profile: Option<String>,
}

impl VerifiedIdentity {
    /// Build from decoded ID-token claims, falling back to the provider's
    /// account record for `user_id` and `email`.
    pub fn from_claims(
        claims: Claims,
        fallback_user_id: Option<&str>,
        fallback_email: Option<&str>,
    ) -> Result<Self, IdentityError> {
        let string_claim = |name: &str| claims.get(name).and_then(Value::as_str).map(str::to_string);

        let user_id = string_claim("user_id")
            .or_else(|| string_claim("sub"))
            .or_else(|| fallback_user_id.map(str::to_string))
            .filter(|id| !id.is_empty())
            .ok_or(IdentityError::InvalidToken)?;
        let email = string_claim("email")
            .or_else(|| fallback_email.map(str::to_string))
            .unwrap_or_default();
        let profile = string_claim(PROFILE_CLAIM);

        Ok(Self {
            user_id,
            email,
            profile,
        })
    }
}

/// Operations delegated to the identity provider.
///
/// Every method except `mint_custom_token` performs one outbound call and
/// never retries.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check an email/password pair
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountIdentity, IdentityError>;

    /// Trade a custom token for an ID token
    async fn exchange_custom_token(&self, token: &str) -> Result<ProviderSession, IdentityError>;

    /// Have the provider validate the session's ID token and return its claims
    async fn verify_session(
        &self,
        session: &ProviderSession,
    ) -> Result<VerifiedIdentity, IdentityError>;

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountIdentity, IdentityError>;

    /// Sign a custom token locally; no network traffic
    fn mint_custom_token(&self, account_id: &str, claims: &Claims) -> Result<String, IdentityError>;

    async fn update_account(
        &self,
        account_id: &str,
        email: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;
}
