// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

use super::helpers::safe_email_log;
use super::validation::ValidationResult;
use crate::services::blob_log::BlobLogError;
use crate::services::identity::IdentityError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Forbidden(String),
    Conflict(String),
    InternalServer(String),
    ServiceUnavailable(String),
    ValidationError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (error_message, code) = match self {
            ApiError::Forbidden(msg) => (msg, "FORBIDDEN"),
            ApiError::Conflict(msg) => (msg, "CONFLICT"),
            ApiError::InternalServer(msg) => (msg, "INTERNAL_SERVER_ERROR"),
            ApiError::ServiceUnavailable(msg) => (msg, "SERVICE_UNAVAILABLE"),
            ApiError::ValidationError(msg) => (msg, "VALIDATION_ERROR"),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials
            | IdentityError::TokenExchangeFailed
            | IdentityError::InvalidToken => ApiError::Forbidden(err.to_string()),
            IdentityError::AccountAlreadyExists(ref email) => {
                info!(email = %safe_email_log(email), "Account already exists");
                ApiError::Conflict(err.to_string())
            }
            IdentityError::Unavailable(ref detail) => {
                warn!(error = %detail, "Identity provider unreachable");
                ApiError::ServiceUnavailable("identity provider unavailable".to_string())
            }
            IdentityError::CreateFailed(_)
            | IdentityError::UpdateFailed(_)
            | IdentityError::Signing(_) => {
                error!(error = %err, "Identity provider operation failed");
                ApiError::InternalServer(err.to_string())
            }
        }
    }
}

impl From<BlobLogError> for ApiError {
    fn from(err: BlobLogError) -> Self {
        match err {
            BlobLogError::StorageUnavailable(_) => {
                warn!(error = %err, "Object store unreachable");
                ApiError::ServiceUnavailable("storage unavailable".to_string())
            }
            BlobLogError::LogConflict(_) => ApiError::Conflict(err.to_string()),
            BlobLogError::CorruptLog { .. } | BlobLogError::Encode(_) => {
                error!(error = %err, "Blob log integrity error");
                ApiError::InternalServer("stored posts could not be processed".to_string())
            }
        }
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}
