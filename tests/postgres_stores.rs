//! Store behaviour against a real Postgres.
//!
//! Needs the database from `configuration.yaml`; run with
//! `cargo test -- --ignored`.

use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use tokenkeep::configuration::{get_configuration, DatabaseSettings};
use tokenkeep::error::DatabaseError;
use tokenkeep::revocation::{PgRevocationStore, RevocationStore};
use tokenkeep::users::{PgUserStore, UserStore};

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn fresh_pool() -> PgPool {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    configure_database(&configuration.database).await
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn try_record_admits_a_single_writer() {
    let store = PgRevocationStore::new(fresh_pool().await);

    assert!(store.try_record("token-a", 2_000).await.unwrap());
    assert!(!store.try_record("token-a", 2_000).await.unwrap());
    assert!(store.is_revoked("token-a").await.unwrap());
    assert!(!store.is_revoked("token-b").await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn concurrent_try_record_has_one_winner() {
    let pool = fresh_pool().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = PgRevocationStore::new(pool.clone());
        handles.push(tokio::spawn(async move {
            store.try_record("contended", 2_000).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn record_is_idempotent_and_purge_respects_expiry() {
    let store = PgRevocationStore::new(fresh_pool().await);

    store.record("old", 1_000).await.unwrap();
    store.record("old", 1_000).await.unwrap();
    store.record("edge", 1_500).await.unwrap();
    store.record("new", 3_000).await.unwrap();

    assert_eq!(store.purge_expired(1_500).await.unwrap(), 1);
    assert!(!store.is_revoked("old").await.unwrap());
    assert!(store.is_revoked("edge").await.unwrap());
    assert!(store.is_revoked("new").await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn user_store_round_trip_and_duplicate_email() {
    let store = PgUserStore::new(fresh_pool().await);

    let user = store.create("pg@example.com", "digest").await.unwrap();
    assert!(user.is_active);
    assert_eq!(store.find_by_id(user.id).await.unwrap(), Some(user.clone()));
    assert_eq!(
        store.find_by_email("pg@example.com").await.unwrap(),
        Some(user)
    );
    assert!(store.exists_by_email("pg@example.com").await.unwrap());

    assert!(matches!(
        store.create("pg@example.com", "other").await,
        Err(DatabaseError::UniqueConstraintViolation(_))
    ));
}
