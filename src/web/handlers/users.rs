use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use num_bigint::BigUint;
use serde::Deserialize;
use tracing::debug;

use super::{require_auth, AppState};
use crate::bridge;
use crate::legacy::profile_to_user;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    screen_name: Option<String>,
    user_id: Option<String>,
}

pub async fn show(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Response {
    let auth = match require_auth(&state, &headers).await {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    let actor = if let Some(screen_name) = query.screen_name {
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
        return (StatusCode::BAD_REQUEST, "No user specified").into_response();
    };

    match state.bsky.get_profile(&auth.access_jwt, &actor).await {
        Ok(profile) => Json(profile_to_user(&profile)).into_response(),
        Err(e) => {
            debug!(actor, "Profile fetch failed: {e:#}");
            (StatusCode::NOT_FOUND, "No user found").into_response()
        }
    }
}
