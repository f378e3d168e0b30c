/// Token claims
///
/// The signed payload carried by both access and refresh tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distinguishes access tokens from refresh tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived, authorizes API calls directly
    Access,
    /// Long-lived, single-use, exchanged for a new pair
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token ID, unique per minted token
    pub jti: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl Claims {
    pub fn new(subject: &str, kind: TokenKind, issued_at: i64, ttl_seconds: i64) -> Self {
        Self {
            sub: subject.to_string(),
            iat: issued_at,
            exp: issued_at + ttl_seconds,
            jti: uuid::Uuid::new_v4().to_string(),
            kind,
        }
    }

    /// Seconds between issuance and expiry
    pub fn lifetime(&self) -> i64 {
        self.exp - self.iat
    }

    /// True once `now` is past the expiry instant
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }
}
