//! Concurrent lock acquisition against the database.
//!
//! Many editors racing for the same session lock must produce exactly one
//! winner, because acquisition is a single conditional update.

use chrono::{Duration, Utc};
use futures::future::join_all;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use wopi_core::clock::{Clock, SystemClock};
use wopi_core::session::{CreateSessionInput, SessionStore};
use wopi_db::SessionRepository;
use wopi_db::migration::Migrator;

use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_set_lock_has_single_winner() {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to migrate");

    let store = Arc::new(SessionStore::new(
        Arc::new(SessionRepository::new(db)),
        Arc::new(SystemClock),
    ));
    let session = store
        .create(CreateSessionInput {
            tenant_id: "default".to_string(),
            storage_name: "docs".to_string(),
            file_path: "race.docx".to_string(),
            permissions: vec!["edit".to_string()],
            account: "sales".to_string(),
            user: None,
            origin_connection_id: None,
            origin_page_id: None,
            ttl_seconds: Some(3600),
        })
        .await
        .expect("Failed to create session");

    let attempts = (0..32).map(|i| {
        let store = store.clone();
        let id = session.id.clone();
        tokio::spawn(async move { store.set_lock(&id, &format!("lock-{i}"), 60).await })
    });

    let results: Vec<bool> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked").expect("set_lock failed"))
        .collect();

    assert_eq!(results.iter().filter(|won| **won).count(), 1);

    let winner = results.iter().position(|won| *won).unwrap();
    assert_eq!(
        store.get_lock(&session.id).await.unwrap(),
        Some(format!("lock-{winner}"))
    );

    let held = store.get(&session.id).await.unwrap();
    let expires = held.lock_expires_at.unwrap();
    assert!(expires > SystemClock.now());
    assert!(expires <= Utc::now() + Duration::seconds(60));
}
