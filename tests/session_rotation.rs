//! Rotation races against the session facade, without HTTP in the way

use std::sync::Arc;

use tokenkeep::auth::{CredentialHasher, TokenService};
use tokenkeep::configuration::JwtSettings;
use tokenkeep::error::TokenError;
use tokenkeep::revocation::{InMemoryRevocationStore, RevocationStore, RevocationSweeper};
use tokenkeep::session::SessionFacade;
use tokenkeep::users::InMemoryUserStore;

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-that-is-long-enough".to_string(),
        algorithm: "HS256".to_string(),
        access_token_expiry: 180,
        refresh_token_expiry: 604800,
    }
}

fn build_facade(store: Arc<InMemoryRevocationStore>) -> Arc<SessionFacade> {
    let tokens = TokenService::from_settings(&jwt_settings(), store)
        .expect("Failed to build token service");

    Arc::new(SessionFacade::new(
        Arc::new(InMemoryUserStore::new()),
        CredentialHasher::new(4).expect("Failed to build hasher"),
        Arc::new(tokens),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refresh_has_exactly_one_winner() {
    let facade = build_facade(Arc::new(InMemoryRevocationStore::new()));
    let session = facade
        .signup("race@example.com", "Abcd1234")
        .await
        .expect("Failed to sign up");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let facade = facade.clone();
        let token = session.refresh_token.clone();
        handles.push(tokio::spawn(async move { facade.refresh(&token).await }));
    }

    let mut winners = 0;
    let mut reused = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => winners += 1,
            Err(e) if e.token_error() == Some(TokenError::ReuseDetected) => reused += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(reused, 15);
}

#[tokio::test]
async fn rotation_chain_only_accepts_latest_token() {
    let facade = build_facade(Arc::new(InMemoryRevocationStore::new()));
    let first = facade.signup("chain@example.com", "Abcd1234").await.unwrap();

    let mut previous = Vec::new();
    let mut current = first.refresh_token.clone();
    for _ in 0..5 {
        let next = facade.refresh(&current).await.unwrap();
        previous.push(std::mem::replace(&mut current, next.refresh_token));
    }

    for stale in &previous {
        let err = facade.refresh(stale).await.unwrap_err();
        assert_eq!(err.token_error(), Some(TokenError::ReuseDetected));
    }
    assert!(facade.refresh(&current).await.is_ok());
}

#[tokio::test]
async fn sweeper_keeps_unexpired_revocations() {
    let store = Arc::new(InMemoryRevocationStore::new());
    let facade = build_facade(store.clone());
    let session = facade.signup("sweep@example.com", "Abcd1234").await.unwrap();

    facade.refresh(&session.refresh_token).await.unwrap();
    assert_eq!(store.len(), 1);

    let sweeper = RevocationSweeper::new(store.clone(), std::time::Duration::from_secs(3600));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);

    assert!(store.is_revoked(&session.refresh_token).await.unwrap());
    let err = facade.refresh(&session.refresh_token).await.unwrap_err();
    assert_eq!(err.token_error(), Some(TokenError::ReuseDetected));
}
