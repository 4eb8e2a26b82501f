//! Authentication handlers

use axum::extract::{Extension, Json};
use tracing::{info, warn};

use super::extractors::AuthedUser;
use super::models::{
    ChangePasswordRequest, ChangePasswordResponse, ClaimsResponse, SigninRequest, SignupRequest,
    TokenResponse,
};
use crate::common::state::SharedState;
use crate::common::{safe_email_log, ApiError, Validator};
use crate::services::identity::{user_claims, IdentityError};

pub const PASSWORD_CHANGE_FAILED: &str = "error during password change.";
pub const ADMIN_WELCOME: &str = "welcome home, dear admin";
pub const ADMIN_REFUSAL: &str = "hey ! get out of here ! i'am gonna call the police !";

/// POST /user/signup
/// Creates an account with the identity provider
///
/// # Request Body
/// ```json
/// { "fullname": "John Doe", "email": "johndoe@gmail.com", "password": "password" }
/// ```
///
/// # Response
/// ```json
/// { "token": "<custom token>" }
/// ```
/// 409 when the email is already registered.
pub async fn signup(
    Extension(state): Extension<SharedState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate(&payload).into_result()?;

    let account = state
        .identity
        .create_account(&payload.email, &payload.password)
        .await
        .map_err(|e| {
            if matches!(e, IdentityError::AccountAlreadyExists(_)) {
                warn!(email = %safe_email_log(&payload.email), "Signup for existing email");
            }
            e
        })?;

    let token = state
        .identity
        .mint_custom_token(&account.account_id, &user_claims())?;

    info!(
        account_id = %account.account_id,
        email = %safe_email_log(&payload.email),
        "User signed up"
    );
    Ok(Json(TokenResponse { token }))
}

/// POST /user/signin
/// Checks email and password with the identity provider
///
/// A wrong password answers 403 only after the configured failure backoff.
pub async fn signin(
    Extension(state): Extension<SharedState>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate(&payload).into_result()?;

    let account = state
        .identity
        .verify_credentials(&payload.email, &payload.password)
        .await?;

    let token = state
        .identity
        .mint_custom_token(&account.account_id, &user_claims())?;

    info!(
        account_id = %account.account_id,
        email = %safe_email_log(&account.email),
        "User signed in"
    );
    Ok(Json(TokenResponse { token }))
}

/// POST /user/changepassword
/// Verifies the current password, sets the new one and signs in again with it
///
/// When the final sign-in with the new password fails the response is
/// `{"error": "error during password change."}` with status 200.
pub async fn change_password(
    Extension(state): Extension<SharedState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>, ApiError> {
    payload.validate(&payload).into_result()?;

    let current = state
        .identity
        .verify_credentials(&payload.email, &payload.password)
        .await?;

    state
        .identity
        .update_account(&current.account_id, &payload.email, &payload.new_password)
        .await?;

    let account = match state
        .identity
        .verify_credentials(&payload.email, &payload.new_password)
        .await
    {
        Ok(account) => account,
        Err(e) => {
            warn!(
                error = %e,
                account_id = %current.account_id,
                "Sign-in with the new password failed after update"
            );
            return Ok(Json(ChangePasswordResponse::Failed {
                error: PASSWORD_CHANGE_FAILED.to_string(),
            }));
        }
    };

    let token = state
        .identity
        .mint_custom_token(&account.account_id, &user_claims())?;

    info!(account_id = %account.account_id, "Password changed");
    Ok(Json(ChangePasswordResponse::Token(TokenResponse { token })))
}

/// POST /user/get_claims
/// Returns the profile claim and user id carried by the bearer token
pub async fn get_claims(user: AuthedUser) -> Json<ClaimsResponse> {
    Json(ClaimsResponse {
        profile: user.profile,
        user_id: user.user_id,
    })
}

/// POST /user/polite_if_you_are_admin
/// Plain-text greeting, friendly only when the profile claim mentions `admin`
pub async fn polite_if_you_are_admin(user: AuthedUser) -> &'static str {
    if user.is_admin() {
        info!(user_id = %user.user_id, "Admin greeted");
        ADMIN_WELCOME
    } else {
        ADMIN_REFUSAL
    }
}
