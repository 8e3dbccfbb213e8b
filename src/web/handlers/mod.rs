pub mod auth;
pub mod favorites;
pub mod statuses;
pub mod timelines;
pub mod users;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use num_bigint::BigUint;

use super::AppState;
use crate::auth::{AuthContext, AuthError};
use crate::bridge::{self, RecordRef};

/// Authenticate a request or produce the legacy 401.
pub(super) async fn require_auth(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, Response> {
    crate::auth::authorize(&state.db, &state.bsky, headers)
        .await
        .map_err(|e| match e {
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "OAuth token not found in Authorization header",
            )
                .into_response(),
            AuthError::Internal(e) => {
                tracing::error!("Session lookup failed: {e:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Session store unavailable").into_response()
            }
        })
}

/// Parse an `:id` path parameter, tolerating the `.json`/`.xml` suffix
/// legacy clients append to the final path segment.
pub(super) fn parse_id_param(param: &str) -> Option<BigUint> {
    let digits = param
        .strip_suffix(".json")
        .or_else(|| param.strip_suffix(".xml"))
        .unwrap_or(param);
    digits.parse().ok()
}

/// Decode a record identifier or produce the legacy 404. Absent, malformed,
/// forged, and wrong-kind identifiers all look like a missing status.
pub(super) fn record_from_id(id: &BigUint) -> Result<RecordRef, Response> {
    bridge::decode_record(id).map_err(|_| status_not_found())
}

pub(super) fn status_not_found() -> Response {
    (StatusCode::NOT_FOUND, "No status found with that ID").into_response()
}
