use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::{parse_id_param, record_from_id, require_auth, status_not_found, AppState};
use crate::bluesky::{PostView, StrongRef};
use crate::bridge::RecordAddress;
use crate::legacy::post_to_tweet;

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let (auth, post, parent) = match load_target(&state, &headers, &id).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    if let Err(e) = state
        .bsky
        .create_like(
            &auth.access_jwt,
            &auth.did_str(),
            StrongRef {
                uri: post.uri.clone(),
                cid: post.cid.clone(),
            },
        )
        .await
    {
        error!("Failed to create like: {e:#}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to favorite").into_response();
    }

    let mut tweet = post_to_tweet(&post, parent.as_ref());
    tweet.favorited = true;
    Json(tweet).into_response()
}

pub async fn destroy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let (auth, post, parent) = match load_target(&state, &headers, &id).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    // The viewer's own like record names the rkey we have to delete.
    let Some(like_uri) = post.viewer.as_ref().and_then(|viewer| viewer.like.clone()) else {
        return (StatusCode::NOT_FOUND, "You have not favorited this status").into_response();
    };
    let Ok(like_address) = like_uri.parse::<RecordAddress>() else {
        error!(like_uri, "Upstream returned an unparseable like record URI");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to unfavorite").into_response();
    };

    if let Err(e) = state
        .bsky
        .delete_record(
            &auth.access_jwt,
            &auth.did_str(),
            like_address.collection.nsid(),
            &like_address.rkey.to_string(),
        )
        .await
    {
        error!("Failed to delete like: {e:#}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to unfavorite").into_response();
    }

    let mut tweet = post_to_tweet(&post, parent.as_ref());
    tweet.favorited = false;
    Json(tweet).into_response()
}

/// Auth + id decode + upstream fetch, shared by both directions.
async fn load_target(
    state: &AppState,
    headers: &HeaderMap,
    id_param: &str,
) -> Result<(crate::auth::AuthContext, PostView, Option<PostView>), Response> {
    let auth = require_auth(state, headers).await?;

    let Some(id) = parse_id_param(id_param) else {
        return Err((StatusCode::BAD_REQUEST, "Invalid ID format").into_response());
    };
    let record = record_from_id(&id)?;

    let thread = state
        .bsky
        .get_post_thread(&auth.access_jwt, &record.address.at_uri(), 0, 1)
        .await
        .map_err(|e| {
            tracing::debug!("Post fetch failed: {e:#}");
            status_not_found()
        })?
        .thread;

    let Some(post) = thread.post() else {
        return Err(status_not_found());
    };
    let parent = thread.parent_post().cloned();

    Ok((auth, post.clone(), parent))
}
