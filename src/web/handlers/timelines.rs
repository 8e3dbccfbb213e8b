use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use num_bigint::BigUint;
use serde::Deserialize;
use tracing::error;

use super::{require_auth, AppState};
use crate::bridge;
use crate::timeline::FeedScope;

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    count: Option<u32>,
    max_id: Option<String>,
    screen_name: Option<String>,
    user_id: Option<String>,
}

pub async fn home_timeline(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TimelineQuery>,
) -> Response {
    let auth = match require_auth(&state, &headers).await {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    let max_id = match parse_max_id(query.max_id.as_deref()) {
        Ok(max_id) => max_id,
        Err(response) => return response,
    };

    match state
        .timeline
        .page(
            &auth,
            FeedScope::Home,
            max_id.as_ref(),
            query.count.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await
    {
        Ok(tweets) => Json(tweets).into_response(),
        Err(e) => {
            error!("Failed to fetch home timeline: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch timeline").into_response()
        }
    }
}

pub async fn user_timeline(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TimelineQuery>,
) -> Response {
    let auth = match require_auth(&state, &headers).await {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    // Whose posts: a screen name, a bridged user ID, or the caller's own.
    let actor = if let Some(screen_name) = query.screen_name.clone() {
        screen_name
    } else if let Some(raw) = query.user_id.as_deref() {
        let Some(actor) = raw
            .parse::<BigUint>()
            .ok()
            .and_then(|id| bridge::decode_actor(&id).ok())
        else {
            return (StatusCode::NOT_FOUND, "No user found with that ID").into_response();
        };
        actor.to_string()
    } else {
        auth.did_str()
    };

    let max_id = match parse_max_id(query.max_id.as_deref()) {
        Ok(max_id) => max_id,
        Err(response) => return response,
    };

    match state
        .timeline
        .page(
            &auth,
            FeedScope::Author(actor),
            max_id.as_ref(),
            query.count.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await
    {
        Ok(tweets) => Json(tweets).into_response(),
        Err(e) => {
            error!("Failed to fetch user timeline: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch timeline").into_response()
        }
    }
}

fn parse_max_id(raw: Option<&str>) -> Result<Option<BigUint>, Response> {
    match raw {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            (StatusCode::BAD_REQUEST, "Invalid max_id format").into_response()
        }),
    }
}
