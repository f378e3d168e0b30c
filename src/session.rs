/// Session Facade
///
/// Signup, login, refresh and logout for the transport layer. Composes the
/// credential hasher, the user store and the token service; holds no session
/// state of its own.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::auth::{validate_password_strength, CredentialHasher, TokenPair, TokenService};
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, TokenError};
use crate::users::{User, UserStore};
use crate::validators::normalize_email;

/// Successful outcome of every token-producing session operation
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_in: i64,
    pub user_id: String,
}

impl From<TokenPair> for SessionTokens {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            access_expires_in: pair.access_expires_in,
            refresh_token: pair.refresh_token,
            refresh_expires_in: pair.refresh_expires_in,
            user_id: pair.subject,
        }
    }
}

/// Hashed once and verified against on the unknown-email login path
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-accounts";

pub struct SessionFacade {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    tokens: Arc<TokenService>,
    dummy_digest: OnceCell<String>,
}

impl SessionFacade {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: CredentialHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            dummy_digest: OnceCell::new(),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Register a new account and open its first session
    ///
    /// # Errors
    /// - Validation errors for a malformed email or weak password
    /// - `AuthError::DuplicateAccount` if the email is already registered
    pub async fn signup(&self, email: &str, password: &str) -> Result<SessionTokens, AppError> {
        let context = ErrorContext::new("signup");

        let email = normalize_email(email)?;
        validate_password_strength(password)?;

        if self.users.exists_by_email(&email).await? {
            return Err(AuthError::DuplicateAccount.into());
        }

        let password_hash = self.hash_blocking(password.to_string()).await?;

        // A concurrent signup can still win the unique index between the
        // existence check and this insert
        let user = match self.users.create(&email, &password_hash).await {
            Ok(user) => user,
            Err(DatabaseError::UniqueConstraintViolation(_)) => {
                return Err(AuthError::DuplicateAccount.into())
            }
            Err(e) => {
                let err = AppError::from(e);
                context.log_error(&err);
                return Err(err);
            }
        };

        let tokens = self.tokens.issue_pair(&user.id.to_string())?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %user.id,
            "User registered successfully"
        );

        Ok(tokens.into())
    }

    /// Authenticate with email and password
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionTokens, AppError> {
        let context = ErrorContext::new("login");

        let user = match normalize_email(email) {
            Ok(email) => self.users.find_by_email(&email).await?,
            Err(_) => None,
        };

        let user = match user {
            Some(user) => user,
            None => {
                self.verify_against_dummy(password).await?;
                let err = AppError::from(AuthError::InvalidCredentials);
                context.log_error(&err);
                return Err(err);
            }
        };

        let context = context.with_user_id(user.id.to_string());

        if !self
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?
        {
            let err = AppError::from(AuthError::InvalidCredentials);
            context.log_error(&err);
            return Err(err);
        }

        if !user.is_active {
            let err = AppError::from(AuthError::AccountDisabled);
            context.log_error(&err);
            return Err(err);
        }

        let tokens = self.tokens.issue_pair(&user.id.to_string())?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %user.id,
            "User logged in successfully"
        );

        Ok(tokens.into())
    }

    /// Rotate a refresh token into a new session pair
    ///
    /// Token errors from the service pass through unchanged. The old token is
    /// consumed before the account is re-checked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AppError> {
        let context = ErrorContext::new("token_refresh");

        let pair = match self.tokens.rotate(refresh_token).await {
            Ok(pair) => pair,
            Err(e) => {
                if e.token_error() == Some(TokenError::ReuseDetected) {
                    context.log_error(&e);
                }
                return Err(e);
            }
        };

        let context = context.with_user_id(pair.subject.clone());
        if let Err(e) = self.active_user(&pair.subject).await {
            context.log_error(&e);
            return Err(e);
        }

        tracing::info!(
            request_id = %context.request_id,
            user_id = %pair.subject,
            "Token refreshed successfully"
        );

        Ok(pair.into())
    }

    /// End a session
    ///
    /// Never fails: an undecodable token is already unusable, and a store
    /// failure is logged rather than surfaced.
    pub async fn logout(&self, refresh_token: &str) {
        if let Err(e) = self.tokens.invalidate(refresh_token).await {
            ErrorContext::new("logout").log_error(&e);
        }
    }

    /// Resolve the account behind a verified access token subject
    pub async fn current_user(&self, subject: &str) -> Result<User, AppError> {
        self.active_user(subject).await
    }

    async fn active_user(&self, subject: &str) -> Result<User, AppError> {
        let id = Uuid::parse_str(subject).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled.into());
        }

        Ok(user)
    }

    /// One bcrypt verification with no account behind it
    async fn verify_against_dummy(&self, password: &str) -> Result<(), AppError> {
        let digest = self
            .dummy_digest
            .get_or_try_init(|| self.hash_blocking(DUMMY_PASSWORD.to_string()))
            .await?;
        self.verify_blocking(password.to_string(), digest.clone())
            .await?;
        Ok(())
    }

    async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_blocking(&self, password: String, digest: String) -> Result<bool, AppError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))
    }
}
