use super::models::{ChangePasswordRequest, SigninRequest, SignupRequest};
use crate::common::{ValidationResult, Validator};

impl Validator<SignupRequest> for SignupRequest {
    fn validate(&self, data: &SignupRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require("fullname", &data.fullname);
        result.require_email("email", &data.email);
        result.require("password", &data.password);
        result
    }
}

impl Validator<SigninRequest> for SigninRequest {
    fn validate(&self, data: &SigninRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_email("email", &data.email);
        result.require("password", &data.password);
        result
    }
}

impl Validator<ChangePasswordRequest> for ChangePasswordRequest {
    fn validate(&self, data: &ChangePasswordRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_email("email", &data.email);
        result.require("password", &data.password);
        result.require("new_password", &data.new_password);
        result
    }
}
