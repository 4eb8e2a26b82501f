// Common validation types and traits

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Records an error when `value` is blank
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add_error(field, &format!("{} is required", field));
        }
    }

    /// Records an error when `value` is blank or not shaped like an email address
    pub fn require_email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.add_error(field, "Email is required");
        } else if !is_plausible_email(value) {
            self.add_error(field, "Email must be valid");
        }
    }

    /// Converts into `Err(self)` when any error was recorded
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}
