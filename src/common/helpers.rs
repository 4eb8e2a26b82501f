// Helper functions for safe logging

use serde_json::Value;

/// Field names whose values never reach the logs
const REDACTED_FIELDS: &[&str] = &[
    "password",
    "new_password",
    "token",
    "idToken",
    "refreshToken",
    "access_token",
    "assertion",
];

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.chars().count() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        match (parts.as_slice(), parts[0].chars().next()) {
            ([_, domain], Some(first)) => format!("{}***@{}", first, domain),
            _ => "***@***.***".to_string(),
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Replaces credential-bearing fields of a JSON document with `"***"`,
/// recursing through nested objects and arrays.
pub fn redact_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    *inner = Value::String("***".to_string());
                } else {
                    redact_json(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json),
        _ => {}
    }
}
