//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::common::state::SharedState;
use crate::common::helpers::safe_token_log;
use crate::common::{safe_email_log, ApiError};
use crate::services::identity::IdentityProvider;

/// Caller identity established from a bearer custom token.
///
/// The token is exchanged with the identity provider for an ID token, which the
/// provider then validates; the claims of that ID token become this value.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: String,
    pub email: String,
    pub profile: Option<String>,
}

impl AuthedUser {
    pub fn is_admin(&self) -> bool {
        self.profile
            .as_deref()
            .map(|profile| profile.contains("admin"))
            .unwrap_or(false)
    }

    /// Exchange and verify `token` against the provider
    pub async fn from_bearer(
        identity: &dyn IdentityProvider,
        token: &str,
    ) -> Result<Self, ApiError> {
        let session = identity.exchange_custom_token(token).await.map_err(|e| {
            warn!(token = %safe_token_log(token), error = %e, "Bearer token exchange failed");
            e
        })?;
        let verified = identity.verify_session(&session).await?;

        debug!(
            user_id = %verified.user_id,
            email = %safe_email_log(&verified.email),
            expires_in = ?session.expires_in,
            has_refresh_token = session.refresh_token.is_some(),
            "Bearer token verified"
        );

        Ok(AuthedUser {
            user_id: verified.user_id,
            email: verified.email,
            profile: verified.profile,
        })
    }
}

/// Credentials of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = match headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        Some(v) if !v.trim().is_empty() => v.trim(),
        _ => {
            warn!("Authentication failed: missing Authorization header");
            return Err(ApiError::Forbidden("Not authenticated".into()));
        }
    };

    match value.split_once(' ') {
        Some((scheme, credentials))
            if scheme.eq_ignore_ascii_case("bearer") && !credentials.trim().is_empty() =>
        {
            Ok(credentials.trim().to_string())
        }
        _ => {
            warn!("Authentication failed: Authorization header is not a bearer token");
            Err(ApiError::Forbidden(
                "Invalid authentication credentials".into(),
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<SharedState> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let token = bearer_token(&parts.headers)?;
        AuthedUser::from_bearer(app_state.identity.as_ref(), &token).await
    }
}
