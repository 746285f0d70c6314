/// Input validators for the auth endpoints
///
/// Emails are accepted as `local@host` (no TLD required, for local
/// development) and normalized to lowercase before any lookup or insert.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

pub const MAX_PASSWORD_LENGTH: usize = 128;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+$").expect("email pattern is valid");
}

/// Validate an email address and return its lowercased form
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "Please enter a valid email address".to_string(),
        ));
    }

    Ok(trimmed.to_lowercase())
}

/// Password rules for registration: present and at most 128 characters
pub fn is_valid_new_password(password: &str) -> Result<(), ValidationError> {
    is_present_password(password)?;

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

/// Password rule for login: present
pub fn is_present_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }
    Ok(())
}
