/// Token Codec
///
/// Encodes and decodes signed, time-bound claims with a symmetric key.
/// Signature and algorithm checks are delegated to `jsonwebtoken`; the expiry
/// check is done here against an explicit clock value so that callers (and
/// tests) control the instant a token is judged at.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::error::{AppError, ConfigError, TokenError};

/// Signs and verifies tokens with the configured secret and algorithm
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec from the signing settings
    ///
    /// # Errors
    /// Returns a configuration error if the secret is empty or the algorithm
    /// is not one of HS256, HS384, HS512
    pub fn new(config: &JwtSettings) -> Result<Self, AppError> {
        if config.secret.is_empty() {
            return Err(AppError::Config(ConfigError::MissingRequired(
                "jwt.secret".to_string(),
            )));
        }

        let algorithm = Algorithm::from_str(&config.algorithm).map_err(|_| {
            AppError::Config(ConfigError::InvalidValue(format!(
                "unknown jwt.algorithm '{}'",
                config.algorithm
            )))
        })?;

        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AppError::Config(ConfigError::InvalidValue(format!(
                "jwt.algorithm '{}' is not a symmetric algorithm",
                config.algorithm
            ))));
        }

        let mut validation = Validation::new(algorithm);
        // Expiry is checked in `decode_at` against the caller's clock
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            ["sub", "iat", "exp"].iter().map(|c| c.to_string()).collect::<HashSet<_>>();

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        })
    }

    /// Encode a token issued now
    ///
    /// Returns the token string and its lifetime in seconds.
    pub fn encode(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<(String, i64), AppError> {
        self.encode_at(subject, kind, ttl, Utc::now().timestamp())
    }

    /// Encode a token issued at `now` (Unix seconds)
    pub fn encode_at(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
        now: i64,
    ) -> Result<(String, i64), AppError> {
        let ttl_seconds = ttl.num_seconds();
        if ttl_seconds <= 0 {
            return Err(AppError::Internal(format!(
                "Token lifetime must be positive, got {}s",
                ttl_seconds
            )));
        }

        let claims = Claims::new(subject, kind, now, ttl_seconds);

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok((token, ttl_seconds))
    }

    /// Decode and validate a token against the current time
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_at(token, Utc::now().timestamp())
    }

    /// Decode and validate a token as of `now` (Unix seconds)
    ///
    /// # Errors
    /// - `TokenError::Invalid` on a bad signature, unexpected algorithm,
    ///   malformed token or missing claim
    /// - `TokenError::Expired` when `now` is past the expiry
    pub fn decode_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    tracing::debug!(error = %e, "Token failed verification");
                    TokenError::Invalid
                }
            })?;

        if claims.exp <= claims.iat {
            return Err(TokenError::Invalid);
        }

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_expiry: 180,
            refresh_token_expiry: 604800,
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(&get_test_config()).expect("valid config")
    }

    #[test]
    fn test_round_trip_preserves_subject_kind_and_lifetime() {
        let codec = codec();

        for (kind, ttl) in [(TokenKind::Access, 180), (TokenKind::Refresh, 604800)] {
            let (token, expires_in) = codec
                .encode("user-42", kind, Duration::seconds(ttl))
                .expect("Failed to generate token");
            let claims = codec.decode(&token).expect("Failed to validate token");

            assert_eq!(expires_in, ttl);
            assert_eq!(claims.sub, "user-42");
            assert_eq!(claims.kind, kind);
            assert_eq!(claims.exp, claims.iat + ttl);
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = codec();
        let issued_at = 1_700_000_000;
        let (token, _) = codec
            .encode_at("user-1", TokenKind::Access, Duration::seconds(60), issued_at)
            .unwrap();
        let expiry = issued_at + 60;

        assert!(codec.decode_at(&token, expiry - 1).is_ok());
        assert_eq!(codec.decode_at(&token, expiry + 1), Err(TokenError::Expired));
    }

    #[test]
    fn test_token_issued_in_the_past_is_expired_now() {
        let codec = codec();
        let (token, _) = codec
            .encode_at("user-1", TokenKind::Refresh, Duration::seconds(60), 1_000)
            .unwrap();

        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_invalid_token() {
        let codec = codec();

        assert_eq!(codec.decode("invalid.token.here"), Err(TokenError::Invalid));
        assert_eq!(codec.decode(""), Err(TokenError::Invalid));
        assert_eq!(codec.decode("not a token"), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tampering_any_byte_is_rejected() {
        let codec = codec();
        let (token, _) = codec
            .encode("user-1", TokenKind::Refresh, Duration::seconds(600))
            .unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert_eq!(
                codec.decode(&tampered),
                Err(TokenError::Invalid),
                "tampering byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_wrong_secret() {
        let (token, _) = codec()
            .encode("user-1", TokenKind::Access, Duration::seconds(60))
            .unwrap();

        let mut other = get_test_config();
        other.secret = "a-completely-different-secret-value".to_string();
        let other = TokenCodec::new(&other).unwrap();

        assert_eq!(other.decode(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_unexpected_algorithm() {
        let (token, _) = codec()
            .encode("user-1", TokenKind::Access, Duration::seconds(60))
            .unwrap();

        let mut hs512 = get_test_config();
        hs512.algorithm = "HS512".to_string();
        let hs512 = TokenCodec::new(&hs512).unwrap();

        assert_eq!(hs512.decode(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_missing_claim_is_invalid() {
        let config = get_test_config();
        let payload = serde_json::json!({ "sub": "user-1", "iat": 1, "type": "access" });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec().decode(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let mut empty_secret = get_test_config();
        empty_secret.secret = String::new();
        assert!(TokenCodec::new(&empty_secret).is_err());

        let mut asymmetric = get_test_config();
        asymmetric.algorithm = "RS256".to_string();
        assert!(TokenCodec::new(&asymmetric).is_err());

        let mut unknown = get_test_config();
        unknown.algorithm = "HS1024".to_string();
        assert!(TokenCodec::new(&unknown).is_err());
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        assert!(codec()
            .encode("user-1", TokenKind::Access, Duration::seconds(0))
            .is_err());
    }
}
