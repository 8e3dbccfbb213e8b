//! Timeline bridge flow against a mocked upstream: paging, continuation
//! anchoring, and the fallback path.

use std::time::Duration;

use bluesky_legacy_bridge::auth::AuthContext;
use bluesky_legacy_bridge::bluesky::BlueskyClient;
use bluesky_legacy_bridge::bridge::{self, RecordAddress};
use bluesky_legacy_bridge::continuation::ContinuationStore;
use bluesky_legacy_bridge::crypto::SessionKey;
use bluesky_legacy_bridge::db::Database;
use bluesky_legacy_bridge::timeline::{FeedScope, TimelineBridge};
use chrono::DateTime;
use num_bigint::BigUint;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALICE: &str = "did:plc:dqibjxtqfn6hydazpetzr2w4";
const OLDER_URI: &str = "at://did:plc:dqibjxtqfn6hydazpetzr2w4/app.bsky.feed.post/3lchbospvbc2j";
const NEWER_URI: &str = "at://did:plc:dqibjxtqfn6hydazpetzr2w4/app.bsky.feed.post/3lcm7b2pjio22";
const OLDER_AT: &str = "2023-11-14T00:00:00Z";
const NEWER_AT: &str = "2023-11-15T00:00:00Z";

fn post_json(uri: &str, text: &str, created_at: &str) -> serde_json::Value {
    json!({
        "post": {
            "uri": uri,
            "cid": "bafyreidw2uvnhns5bacdii7gozrou4rg25cpcxhe6cbhfws2c5hpsvycdm",
            "author": { "did": ALICE, "handle": "alice.bsky.social" },
            "record": { "text": text, "createdAt": created_at }
        }
    })
}

fn timeline_json(cursor: Option<&str>) -> serde_json::Value {
    json!({
        "feed": [
            post_json(NEWER_URI, "newer", NEWER_AT),
            post_json(OLDER_URI, "older", OLDER_AT),
        ],
        "cursor": cursor,
    })
}

fn auth_context() -> AuthContext {
    AuthContext {
        session_id: "s1".to_string(),
        did: "did:plc:khcyntihpu7snjszuojjgjc4".parse().unwrap(),
        handle: "viewer.bsky.social".to_string(),
        key: SessionKey::derive(b"secret", "s1"),
        access_jwt: "test-jwt".to_string(),
    }
}

fn expected_anchor() -> BigUint {
    let address: RecordAddress = OLDER_URI.parse().unwrap();
    let created_at = DateTime::parse_from_rfc3339(OLDER_AT).unwrap().to_utc();
    bridge::record_id(&address, created_at, None)
}

async fn setup(
    server: &MockServer,
) -> (TimelineBridge, ContinuationStore, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::new(&temp_dir.path().join("test.sqlite"))
        .await
        .expect("Failed to create database");
    let store = ContinuationStore::new(db, Duration::from_secs(3600));
    let bsky = BlueskyClient::new(&server.uri(), &server.uri());
    (TimelineBridge::new(bsky, store.clone()), store, temp_dir)
}

#[tokio::test]
async fn test_first_page_anchors_the_next_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getTimeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_json(Some("cur1"))))
        .mount(&server)
        .await;

    let (bridge_svc, store, _temp_dir) = setup(&server).await;
    let auth = auth_context();

    let tweets = bridge_svc
        .page(&auth, FeedScope::Home, None, 20)
        .await
        .expect("page");
    assert_eq!(tweets.len(), 2);
    assert_eq!(tweets[0].text, "newer");

    // The upstream's next cursor is now keyed by the oldest item's ID,
    // which is exactly the max_id a legacy client will send back.
    let stored = store
        .get(
            &auth.did_str(),
            &auth.session_id,
            &expected_anchor(),
            &auth.key,
        )
        .await;
    assert_eq!(stored, Some("cur1".to_string()));

    let oldest_id: BigUint = tweets[1].id_str.parse().unwrap();
    assert_eq!(oldest_id, expected_anchor());
}

#[tokio::test]
async fn test_max_id_resumes_from_stored_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getTimeline"))
        .and(query_param("cursor", "cur1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_json(None)))
        .expect(1)
        .mount(&server)
        .await;

    let (bridge_svc, store, _temp_dir) = setup(&server).await;
    let auth = auth_context();
    let anchor = expected_anchor();

    store
        .put(&auth.did_str(), &auth.session_id, &anchor, "cur1", &auth.key)
        .await
        .expect("seed continuation");

    let tweets = bridge_svc
        .page(&auth, FeedScope::Home, Some(&anchor), 20)
        .await
        .expect("page");
    assert_eq!(tweets.len(), 2);
}

#[tokio::test]
async fn test_unknown_max_id_falls_back_to_the_top() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getTimeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_json(Some("cur1"))))
        .mount(&server)
        .await;

    let (bridge_svc, _store, _temp_dir) = setup(&server).await;
    let auth = auth_context();

    // An anchor nothing ever stored (e.g. from before a restart past TTL).
    let unknown = BigUint::from(987_654_321u64);
    let tweets = bridge_svc
        .page(&auth, FeedScope::Home, Some(&unknown), 20)
        .await
        .expect("page");
    assert_eq!(tweets.len(), 2);

    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].url.query().unwrap_or("").contains("cursor"));
}

#[tokio::test]
async fn test_author_feed_scope_hits_get_author_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/xrpc/app.bsky.feed.getAuthorFeed"))
        .and(query_param("actor", ALICE))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_json(None)))
        .expect(1)
        .mount(&server)
        .await;

    let (bridge_svc, _store, _temp_dir) = setup(&server).await;
    let tweets = bridge_svc
        .page(
            &auth_context(),
            FeedScope::Author(ALICE.to_string()),
            None,
            20,
        )
        .await
        .expect("page");
    assert_eq!(tweets.len(), 2);
}
