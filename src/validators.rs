/// Input validators for account operations
///
/// Emails are normalized (trimmed, lowercased) before they reach the user
/// store so lookups and the unique index agree on one spelling.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_LOCAL_PART_LENGTH: usize = 64;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address and returns its normalized form
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    match trimmed.find('@') {
        Some(at) if at <= MAX_LOCAL_PART_LENGTH => {}
        _ => return Err(ValidationError::InvalidFormat("email".to_string())),
    }

    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email_is_lowercased() {
        assert_eq!(
            normalize_email("  John.Doe@Example.COM ").unwrap(),
            "john.doe@example.com"
        );
    }

    #[test]
    fn test_invalid_emails() {
        let invalid = vec!["", "   ", "notanemail", "user@", "@example.com", "user@@example.com"];

        for email in invalid {
            assert!(normalize_email(email).is_err(), "accepted {:?}", email);
        }
    }

    #[test]
    fn test_too_long_email() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            normalize_email(&email),
            Err(ValidationError::TooLong(_, MAX_EMAIL_LENGTH))
        ));
    }

    #[test]
    fn test_long_local_part_rejected() {
        let email = format!("{}@example.com", "a".repeat(65));
        assert!(normalize_email(&email).is_err());
    }
}
