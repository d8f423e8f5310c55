//! Input checks shared by the account operations.
//!
//! Each check returns the client-facing message on failure, in the order the
//! operations apply them.

use lazy_static::lazy_static;
use regex::Regex;

use super::errors::AuthError;

pub const PASSWORD_SYMBOLS: &str = r#"!@#$%^&*(),.?":{}|<>"#;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == 10 && mobile.bytes().all(|b| b.is_ascii_digit())
}

/// Trimmed, lowercased form used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the value when present and non-empty.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

pub(crate) fn check_email(email: &str) -> Result<(), AuthError> {
    if !is_valid_email(email) {
        return Err(AuthError::validation("Please enter a valid email address"));
    }
    Ok(())
}

pub(crate) fn check_mobile(mobile: &str) -> Result<(), AuthError> {
    if !is_valid_mobile(mobile) {
        return Err(AuthError::validation("Mobile number must be exactly 10 digits"));
    }
    Ok(())
}

pub(crate) fn check_full_name(full_name: &str) -> Result<(), AuthError> {
    if full_name.trim().chars().count() < 3 {
        return Err(AuthError::validation(
            "Full name must be at least 3 characters long",
        ));
    }
    Ok(())
}

/// Provider-supplied names only need to be non-trivial.
pub(crate) fn check_federated_name(full_name: &str) -> Result<(), AuthError> {
    if full_name.trim().chars().count() < 2 {
        return Err(AuthError::validation("Invalid name from Google account"));
    }
    Ok(())
}

pub(crate) fn check_password_strength(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < 6 {
        return Err(AuthError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    if !(has_digit && has_symbol && has_upper) {
        return Err(AuthError::validation(
            "Password must contain at least one number, one special character, and one uppercase letter",
        ));
    }
    Ok(())
}
