//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Limits are chosen based on:
//! - Reasonable UX limits for names, addresses, contact fields
//! - SQLite TEXT has no built-in length enforcement

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: product names, customer names
pub const MAX_NAME_LEN: usize = 200;

/// Short identifiers: phone, state code, CEP / postal code
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// URLs / image paths
pub const MAX_URL_LEN: usize = 2048;

/// Address fields: street, neighborhood, city, complement
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Validation helpers (CRUD handlers) ──────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

// ── Validation helpers (checkout engine) ────────────────────────────

use crate::checkout::error::CheckoutError;

/// Validate a required customer field for checkout (non-empty + max length).
pub fn validate_checkout_text(
    value: &str,
    field: &str,
    max_len: usize,
) -> Result<(), CheckoutError> {
    if value.trim().is_empty() {
        return Err(CheckoutError::invalid(format!(
            "missing customer data: {field}"
        )));
    }
    if value.len() > max_len {
        return Err(CheckoutError::invalid(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate an optional customer field for checkout (max length).
pub fn validate_checkout_optional(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), CheckoutError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(CheckoutError::invalid(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_empty_and_whitespace() {
        assert!(validate_required_text("", "name", MAX_NAME_LEN).is_err());
        assert!(validate_required_text("   ", "name", MAX_NAME_LEN).is_err());
        assert!(validate_required_text("ok", "name", MAX_NAME_LEN).is_ok());
    }

    #[test]
    fn required_text_rejects_overlong() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_required_text(&long, "name", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn optional_text_allows_none() {
        assert!(validate_optional_text(&None, "email", MAX_EMAIL_LEN).is_ok());
        let long = Some("x".repeat(MAX_EMAIL_LEN + 1));
        assert!(validate_optional_text(&long, "email", MAX_EMAIL_LEN).is_err());
    }
}
