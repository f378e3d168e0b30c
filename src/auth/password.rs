/// Credential Hashing and Verification
///
/// bcrypt with a configurable work factor. The salt is generated per call and
/// embedded in the digest, so hashing the same password twice gives two
/// different digests.

use bcrypt::{hash, verify};

use crate::configuration::CredentialSettings;
use crate::error::{AppError, ConfigError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// One-way password hasher
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    /// Create a hasher with the given bcrypt cost
    ///
    /// # Errors
    /// Returns a configuration error if `cost` is outside 4..=31
    pub fn new(cost: u32) -> Result<Self, AppError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(AppError::Config(ConfigError::InvalidValue(format!(
                "credentials.hash_cost must be between {} and {}, got {}",
                MIN_COST, MAX_COST, cost
            ))));
        }
        Ok(Self { cost })
    }

    pub fn from_settings(settings: &CredentialSettings) -> Result<Self, AppError> {
        Self::new(settings.hash_cost)
    }

    /// Hash a password
    ///
    /// # Errors
    /// Returns error if bcrypt rejects the input
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored digest
    ///
    /// A malformed digest verifies as `false`.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        match verify(password, digest) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential digest could not be parsed");
                false
            }
        }
    }
}

/// Validate password strength requirements
///
/// Requirements:
/// - 8 to 128 characters
/// - At least one digit, one lowercase and one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    // bcrypt only reads the first 72 bytes; the cap also bounds hashing work
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        ));
    }

    Ok(())
}
