//! Integration tests for the continuation store and the session queries,
//! against a real temp-file SQLite database.

use std::time::Duration;

use bluesky_legacy_bridge::continuation::ContinuationStore;
use bluesky_legacy_bridge::crypto::SessionKey;
use bluesky_legacy_bridge::db::{
    delete_expired_sessions, get_session, insert_session, Database, NewSession,
};
use chrono::Utc;
use num_bigint::BigUint;
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn anchor(n: u64) -> BigUint {
    BigUint::from(n)
}

#[tokio::test]
async fn test_put_then_get() {
    let (db, _temp_dir) = setup_db().await;
    let store = ContinuationStore::new(db, Duration::from_secs(3600));
    let key = SessionKey::derive(b"secret", "s1");

    store
        .put("did:plc:u", "s1", &anchor(42), "cursor-abc", &key)
        .await
        .expect("put");

    assert_eq!(
        store.get("did:plc:u", "s1", &anchor(42), &key).await,
        Some("cursor-abc".to_string())
    );
}

#[tokio::test]
async fn test_miss_on_unknown_anchor() {
    let (db, _temp_dir) = setup_db().await;
    let store = ContinuationStore::new(db, Duration::from_secs(3600));
    let key = SessionKey::derive(b"secret", "s1");

    store
        .put("did:plc:u", "s1", &anchor(42), "cursor-abc", &key)
        .await
        .expect("put");

    assert_eq!(store.get("did:plc:u", "s1", &anchor(43), &key).await, None);
}

#[tokio::test]
async fn test_overwrite_last_write_wins() {
    let (db, _temp_dir) = setup_db().await;
    let store = ContinuationStore::new(db, Duration::from_secs(3600));
    let key = SessionKey::derive(b"secret", "s1");

    store
        .put("did:plc:u", "s1", &anchor(42), "first", &key)
        .await
        .expect("put");
    store
        .put("did:plc:u", "s1", &anchor(42), "second", &key)
        .await
        .expect("overwrite");

    assert_eq!(
        store.get("did:plc:u", "s1", &anchor(42), &key).await,
        Some("second".to_string())
    );
}

#[tokio::test]
async fn test_wrong_key_reads_as_miss() {
    let (db, _temp_dir) = setup_db().await;
    let store = ContinuationStore::new(db, Duration::from_secs(3600));
    let key = SessionKey::derive(b"secret", "s1");
    let rotated = SessionKey::derive(b"rotated", "s1");

    store
        .put("did:plc:u", "s1", &anchor(42), "cursor-abc", &key)
        .await
        .expect("put");

    assert_eq!(
        store.get("did:plc:u", "s1", &anchor(42), &rotated).await,
        None
    );
}

#[tokio::test]
async fn test_session_isolation() {
    let (db, _temp_dir) = setup_db().await;
    let store = ContinuationStore::new(db, Duration::from_secs(3600));
    let key = SessionKey::derive(b"secret", "s1");

    store
        .put("did:plc:u", "s1", &anchor(42), "cursor-abc", &key)
        .await
        .expect("put");

    // Same user, different session: invisible.
    assert_eq!(store.get("did:plc:u", "s2", &anchor(42), &key).await, None);
}

#[tokio::test]
async fn test_expired_record_reads_as_miss_and_sweeps() {
    let (db, _temp_dir) = setup_db().await;
    let store = ContinuationStore::new(db, Duration::from_secs(0));
    let key = SessionKey::derive(b"secret", "s1");

    store
        .put("did:plc:u", "s1", &anchor(42), "cursor-abc", &key)
        .await
        .expect("put");

    assert_eq!(store.get("did:plc:u", "s1", &anchor(42), &key).await, None);
    assert_eq!(store.sweep().await.expect("sweep"), 1);
    assert_eq!(store.sweep().await.expect("sweep again"), 0);
}

#[tokio::test]
async fn test_read_does_not_consume() {
    let (db, _temp_dir) = setup_db().await;
    let store = ContinuationStore::new(db, Duration::from_secs(3600));
    let key = SessionKey::derive(b"secret", "s1");

    store
        .put("did:plc:u", "s1", &anchor(42), "cursor-abc", &key)
        .await
        .expect("put");

    // A client may retry or branch; the record stays readable.
    for _ in 0..3 {
        assert_eq!(
            store.get("did:plc:u", "s1", &anchor(42), &key).await,
            Some("cursor-abc".to_string())
        );
    }
}

#[tokio::test]
async fn test_session_rows_expire() {
    let (db, _temp_dir) = setup_db().await;
    let now = Utc::now().timestamp();

    insert_session(
        db.pool(),
        &NewSession {
            id: "live".to_string(),
            user_did: "did:plc:u".to_string(),
            handle: "u.bsky.social".to_string(),
            access_jwt: vec![1, 2, 3],
            refresh_jwt: vec![4, 5, 6],
            expires_at: now + 3600,
        },
    )
    .await
    .expect("insert live");

    insert_session(
        db.pool(),
        &NewSession {
            id: "dead".to_string(),
            user_did: "did:plc:u".to_string(),
            handle: "u.bsky.social".to_string(),
            access_jwt: vec![1],
            refresh_jwt: vec![2],
            expires_at: now - 1,
        },
    )
    .await
    .expect("insert dead");

    assert!(get_session(db.pool(), "live", now).await.unwrap().is_some());
    assert!(get_session(db.pool(), "dead", now).await.unwrap().is_none());

    assert_eq!(delete_expired_sessions(db.pool(), now).await.unwrap(), 1);
}
