/// Token Service
///
/// Issues, verifies and rotates token pairs. The lifecycle state of a refresh
/// token is never stored as a field; it is derived:
/// - Active: decodes, not expired, no revocation record
/// - Expired: decodes but past expiry
/// - Revoked: a revocation record exists (terminal)
///
/// Access tokens are verified by signature and expiry only. They are never
/// looked up in the revocation store.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::jwt::TokenCodec;
use crate::configuration::JwtSettings;
use crate::error::{AppError, ConfigError, TokenError};
use crate::revocation::RevocationStore;

/// One access token and one refresh token, minted together
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub subject: String,
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_in: i64,
}

/// Converts a configured lifetime in seconds, rejecting values chrono cannot hold
fn lifetime(key: &str, seconds: i64) -> Result<Duration, AppError> {
    Duration::try_seconds(seconds).ok_or_else(|| {
        AppError::Config(ConfigError::InvalidValue(format!(
            "{} is out of range: {}",
            key, seconds
        )))
    })
}

pub struct TokenService {
    codec: TokenCodec,
    store: Arc<dyn RevocationStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(
        codec: TokenCodec,
        store: Arc<dyn RevocationStore>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, AppError> {
        if access_ttl <= Duration::zero() || refresh_ttl <= Duration::zero() {
            return Err(AppError::Config(ConfigError::InvalidValue(
                "token lifetimes must be positive".to_string(),
            )));
        }

        Ok(Self {
            codec,
            store,
            access_ttl,
            refresh_ttl,
        })
    }

    /// Build the codec and service from the signing settings
    pub fn from_settings(
        config: &JwtSettings,
        store: Arc<dyn RevocationStore>,
    ) -> Result<Self, AppError> {
        Self::new(
            TokenCodec::new(config)?,
            store,
            lifetime("jwt.access_token_expiry", config.access_token_expiry)?,
            lifetime("jwt.refresh_token_expiry", config.refresh_token_expiry)?,
        )
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Mint a fresh pair for `subject`
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AppError> {
        let (access_token, access_expires_in) =
            self.codec.encode(subject, TokenKind::Access, self.access_ttl)?;
        let (refresh_token, refresh_expires_in) =
            self.codec.encode(subject, TokenKind::Refresh, self.refresh_ttl)?;

        Ok(TokenPair {
            subject: subject.to_string(),
            access_token,
            access_expires_in,
            refresh_token,
            refresh_expires_in,
        })
    }

    /// Exchange an unused refresh token for a new pair
    ///
    /// The old token is consumed by a single conditional insert into the
    /// revocation store. Of any number of concurrent rotations of the same
    /// token, only the one whose insert lands succeeds; the rest see
    /// `TokenError::ReuseDetected`.
    ///
    /// Reuse is rejected for this request only. Other sessions of the same
    /// subject are left untouched.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.decode_kind(refresh_token, TokenKind::Refresh)?;

        let consumed = self.store.try_record(refresh_token, claims.exp).await?;
        if !consumed {
            tracing::warn!(
                user_id = %claims.sub,
                token_id = %claims.jti,
                "Refresh token reuse detected"
            );
            return Err(TokenError::ReuseDetected.into());
        }

        let pair = self.issue_pair(&claims.sub)?;

        tracing::debug!(user_id = %claims.sub, "Refresh token rotated");

        Ok(pair)
    }

    /// Verify an access token and return its subject
    pub fn verify_access(&self, access_token: &str) -> Result<String, TokenError> {
        self.decode_kind(access_token, TokenKind::Access)
            .map(|claims| claims.sub)
    }

    /// Verify an access token and return its full claims
    pub fn access_claims(&self, access_token: &str) -> Result<Claims, TokenError> {
        self.decode_kind(access_token, TokenKind::Access)
    }

    /// Revoke a refresh token on logout
    ///
    /// Anything that does not decode as a live refresh token is treated as
    /// already unusable and ignored.
    pub async fn invalidate(&self, refresh_token: &str) -> Result<(), AppError> {
        match self.decode_kind(refresh_token, TokenKind::Refresh) {
            Ok(claims) => {
                self.store.record(refresh_token, claims.exp).await?;
                tracing::debug!(user_id = %claims.sub, "Refresh token invalidated");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable refresh token on logout");
                Ok(())
            }
        }
    }

    /// Whether a refresh token has been consumed or invalidated
    pub async fn is_revoked(&self, refresh_token: &str) -> Result<bool, AppError> {
        Ok(self.store.is_revoked(refresh_token).await?)
    }

    fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.codec.decode(token)?;
        if claims.kind != expected {
            tracing::debug!(
                expected = %expected,
                actual = %claims.kind,
                "Token presented with the wrong kind"
            );
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}
