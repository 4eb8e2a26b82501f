//! Authentication request and response models

use serde::{Deserialize, Serialize};

/// Body of `POST /user/signup`
#[derive(Deserialize, Debug)]
pub struct SignupRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /user/signin`
#[derive(Deserialize, Debug)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /user/changepassword`
#[derive(Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub email: String,
    pub password: String,
    pub new_password: String,
}

/// Custom token handed back after signup, signin or password change
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct TokenResponse {
    pub token: String,
}

/// Password change outcome. A failed re-authentication with the new password
/// is reported in the body with a success status.
#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum ChangePasswordResponse {
    Token(TokenResponse),
    Failed { error: String },
}

/// Response of `POST /user/get_claims`
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ClaimsResponse {
    pub profile: Option<String>,
    pub user_id: String,
}
