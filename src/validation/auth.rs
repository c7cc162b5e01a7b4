use garde::Validate;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Signup payload, shared by the JSON API and the sign-up form.
#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(email, length(max = 255))]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
}

/// Runs the `garde` rules on a payload.
///
/// # Returns
///
/// `AppError::Validation` carrying the report if any rule fails.
pub fn validate<T>(payload: &T) -> Result<()>
where
    T: Validate,
    T::Context: Default,
{
    payload
        .validate()
        .map_err(|report| AppError::Validation(report.to_string().trim().to_string()))
}

/// Validates a signup payload.
pub fn validate_signup(payload: &SignupRequest) -> Result<()> {
    validate(payload)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Name cannot be empty".to_string()));
    }

    Ok(())
}

/// Checks that a password was typed the same way twice.
pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_a_reasonable_signup() {
        assert!(validate_signup(&signup("Mo", "mo@example.com", "secret123")).is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        assert!(validate_signup(&signup("Mo", "not-an-email", "secret123")).is_err());
        assert!(validate_signup(&signup("Mo", "mo@example.com", "short")).is_err());
        assert!(validate_signup(&signup("   ", "mo@example.com", "secret123")).is_err());
        assert!(validate_signup(&signup("", "mo@example.com", "secret123")).is_err());
    }

    #[test]
    fn confirmation_must_match() {
        assert!(validate_password_confirmation("secret123", "secret123").is_ok());
        assert!(matches!(
            validate_password_confirmation("secret123", "secret321"),
            Err(AppError::Validation(_))
        ));
    }
}
