use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{User, UserStore};
use crate::error::DatabaseError;

/// Process-local user store for tests and development runs
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips an account's active flag; returns false if the id is unknown
    pub fn set_active(&self, id: Uuid, is_active: bool) -> bool {
        match self.users.lock() {
            Ok(mut users) => match users.get_mut(&id) {
                Some(user) => {
                    user.is_active = is_active;
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    /// Removes an account; returns false if the id is unknown
    pub fn remove(&self, id: Uuid) -> bool {
        self.users
            .lock()
            .map(|mut users| users.remove(&id).is_some())
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, User>>, DatabaseError> {
        self.users
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("user store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.lock()?.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError> {
        Ok(self.lock()?.values().any(|u| u.email == email))
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let mut users = self.lock()?;

        if users.values().any(|u| u.email == email) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "users_email_key".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryUserStore::new();
        let user = store.create("a@example.com", "digest").await.unwrap();

        assert!(user.is_active);
        assert_eq!(store.find_by_id(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            store.find_by_email("a@example.com").await.unwrap(),
            Some(user)
        );
        assert!(store.exists_by_email("a@example.com").await.unwrap());
        assert!(!store.exists_by_email("b@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = InMemoryUserStore::new();
        store.create("a@example.com", "digest").await.unwrap();

        assert!(matches!(
            store.create("a@example.com", "other").await,
            Err(DatabaseError::UniqueConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_set_active() {
        let store = InMemoryUserStore::new();
        let user = store.create("a@example.com", "digest").await.unwrap();

        assert!(store.set_active(user.id, false));
        assert!(!store.find_by_id(user.id).await.unwrap().unwrap().is_active);
        assert!(!store.set_active(Uuid::new_v4(), false));
    }
}
