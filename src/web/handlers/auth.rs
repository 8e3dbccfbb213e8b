use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use tracing::{error, info};

use super::{require_auth, AppState};
use crate::bridge;
use crate::legacy::profile_to_user;

#[derive(Debug, Deserialize)]
pub struct AccessTokenForm {
    x_auth_username: String,
    x_auth_password: String,
}

/// The xAuth-style token exchange old clients perform at login. The
/// credentials go straight to the upstream; only the resulting JWTs are
/// kept, sealed under the token we hand back.
pub async fn access_token(
    State(state): State<AppState>,
    Form(form): Form<AccessTokenForm>,
) -> Response {
    let upstream = match state
        .bsky
        .create_session(&form.x_auth_username, &form.x_auth_password)
        .await
    {
        Ok(upstream) => upstream,
        Err(e) => {
            info!("Upstream login failed: {e:#}");
            return (StatusCode::UNAUTHORIZED, "Invalid username or password").into_response();
        }
    };

    let issued = match crate::auth::create_session(&state.db, &upstream, state.config.session_ttl)
        .await
    {
        Ok(issued) => issued,
        Err(e) => {
            error!("Failed to persist session: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session")
                .into_response();
        }
    };

    let user_id = bridge::optional_actor_id(issued.user_did.parse().ok().as_ref());
    let body = format!(
        "oauth_token={}&oauth_token_secret=unused&user_id={}&screen_name={}",
        issued.token,
        user_id,
        urlencoding::encode(&issued.handle)
    );
    (StatusCode::OK, body).into_response()
}

pub async fn verify_credentials(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let auth = match require_auth(&state, &headers).await {
        Ok(auth) => auth,
        Err(response) => return response,
    };

    match state.bsky.get_profile(&auth.access_jwt, &auth.did_str()).await {
        Ok(profile) => Json(profile_to_user(&profile)).into_response(),
        Err(e) => {
            error!("Failed to fetch own profile: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch profile").into_response()
        }
    }
}
