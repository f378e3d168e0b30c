//! User account store.
//!
//! The token subsystem only consumes this interface; account management
//! beyond lookup and creation lives elsewhere.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

/// A user account as seen by the session flows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError>;

    /// Creates an active account.
    ///
    /// Fails with `DatabaseError::UniqueConstraintViolation` if the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, DatabaseError>;
}
