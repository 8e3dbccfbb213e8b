use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use chrono::Utc;
use num_bigint::BigUint;
use serde::Deserialize;
use tracing::{debug, error};

use super::{parse_id_param, record_from_id, require_auth, status_not_found, AppState};
use crate::bluesky::{ReplyRefRecord, StrongRef, ThreadNode};
use crate::bridge::{self, RecordAddress};
use crate::legacy::{id_number, post_to_tweet};

pub async fn show(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let auth = match require_auth(&state, &headers).await {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    let Some(id) = parse_id_param(&id) else {
        return (StatusCode::BAD_REQUEST, "Invalid ID format").into_response();
    };
    let record = match record_from_id(&id) {
        Ok(record) => record,
        Err(response) => return response,
    };

    match fetch_post(&state, &auth.access_jwt, &record.address.at_uri()).await {
        Some(thread) => {
            let Some(post) = thread.post() else {
                return status_not_found();
            };
            Json(post_to_tweet(post, thread.parent_post())).into_response()
        }
        None => status_not_found(),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateForm {
    status: String,
    #[serde(default)]
    in_reply_to_status_id: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<StatusUpdateForm>,
) -> Response {
    let auth = match require_auth(&state, &headers).await {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    if form.status.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing status").into_response();
    }

    let reply = match reply_ref(&state, &auth.access_jwt, form.in_reply_to_status_id.as_deref())
        .await
    {
        Ok(reply) => reply,
        Err(response) => return response,
    };

    let created = match state
        .bsky
        .create_post(&auth.access_jwt, &auth.did_str(), &form.status, reply)
        .await
    {
        Ok(created) => created,
        Err(e) => {
            error!("Failed to publish post: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update status")
                .into_response();
        }
    };

    // Echo the post back the way the client will see it in its timeline.
    match fetch_post(&state, &auth.access_jwt, &created.uri).await {
        Some(thread) => match thread.post() {
            Some(post) => Json(post_to_tweet(post, thread.parent_post())).into_response(),
            None => status_not_found(),
        },
        None => {
            error!("Published post could not be fetched back");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update status").into_response()
        }
    }
}

pub async fn retweet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let auth = match require_auth(&state, &headers).await {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    let Some(id) = parse_id_param(&id) else {
        return (StatusCode::BAD_REQUEST, "Invalid ID format").into_response();
    };
    let record = match record_from_id(&id) {
        Ok(record) => record,
        Err(response) => return response,
    };

    let Some(thread) = fetch_post(&state, &auth.access_jwt, &record.address.at_uri()).await
    else {
        return status_not_found();
    };
    let Some(post) = thread.post() else {
        return status_not_found();
    };

    let created = match state
        .bsky
        .create_repost(
            &auth.access_jwt,
            &auth.did_str(),
            StrongRef {
                uri: post.uri.clone(),
                cid: post.cid.clone(),
            },
        )
        .await
    {
        Ok(created) => created,
        Err(e) => {
            error!("Failed to create repost: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to retweet").into_response();
        }
    };

    let original = post_to_tweet(post, thread.parent_post());

    // The fresh repost's identifier: same record, keyed by the reposter,
    // stamped with the clock embedded in the new repost's record key.
    let reposted_at = created
        .uri
        .parse::<RecordAddress>()
        .ok()
        .and_then(|address| address.rkey.timestamp())
        .unwrap_or_else(Utc::now);
    let repost_id = bridge::record_id(&record.address, reposted_at, Some(&auth.did));

    let mut tweet = original.clone();
    tweet.id = id_number(&repost_id);
    tweet.id_str = repost_id.to_string();
    tweet.retweeted = true;
    tweet.created_at = crate::legacy::format_legacy_date(reposted_at);
    tweet.retweeted_status = Some(Box::new(original));

    Json(tweet).into_response()
}

async fn reply_ref(
    state: &AppState,
    access_jwt: &str,
    in_reply_to: Option<&str>,
) -> Result<Option<ReplyRefRecord>, Response> {
    let Some(raw) = in_reply_to.filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let Ok(id) = raw.parse::<BigUint>() else {
        return Err((StatusCode::BAD_REQUEST, "Invalid in_reply_to_status_id format")
            .into_response());
    };
    // Zero is the schema's way of saying "not a reply".
    if id.bits() == 0 {
        return Ok(None);
    }
    let record = record_from_id(&id)?;

    let Some(thread) = fetch_post(state, access_jwt, &record.address.at_uri()).await else {
        return Err(status_not_found());
    };
    let Some(parent) = thread.post() else {
        return Err(status_not_found());
    };

    let parent_ref = StrongRef {
        uri: parent.uri.clone(),
        cid: parent.cid.clone(),
    };
    // Thread root comes from the parent's own reply block; a top-level
    // parent is its own root.
    let root = parent
        .record
        .reply
        .as_ref()
        .map_or_else(|| parent_ref.clone(), |reply| reply.root.clone());

    Ok(Some(ReplyRefRecord {
        root,
        parent: parent_ref,
    }))
}

async fn fetch_post(state: &AppState, access_jwt: &str, uri: &str) -> Option<ThreadNode> {
    match state.bsky.get_post_thread(access_jwt, uri, 0, 1).await {
        Ok(response) => Some(response.thread),
        Err(e) => {
            debug!(uri, "Post fetch failed: {e:#}");
            None
        }
    }
}
