use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context as _, Result};
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use rand::RngCore as _;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bluesky::{BlueskyClient, UpstreamSession};
use crate::bridge::ActorId;
use crate::crypto::{self, SessionKey};
use crate::db::{self, Database, NewSession};

/// Refresh the upstream JWT when it has less than this left to live.
const JWT_STALE_MARGIN_SECS: i64 = 300;

/// Legacy clients send a full OAuth 1.0a authorization header; only the
/// token parameter matters to us.
static OAUTH_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"oauth_token="([^"]+)""#).unwrap());

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or invalid session token")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Everything a request handler needs once the caller is authenticated.
pub struct AuthContext {
    pub session_id: String,
    pub did: ActorId,
    pub handle: String,
    pub key: SessionKey,
    pub access_jwt: String,
}

impl AuthContext {
    /// The DID in its string form, as the upstream API wants it.
    #[must_use]
    pub fn did_str(&self) -> String {
        self.did.to_string()
    }
}

/// A freshly created session: the token goes back to the client verbatim.
pub struct IssuedSession {
    pub token: String,
    pub user_did: String,
    pub handle: String,
}

/// Pull the session token out of the Authorization header. Accepts both a
/// plain bearer token and the OAuth parameter form old clients send.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    if let Some(token) = value.strip_prefix("Bearer ") {
        return Some(token.trim().to_string());
    }
    OAUTH_TOKEN_RE
        .captures(value)
        .map(|caps| caps[1].to_string())
}

/// Persist a new session for an upstream login and mint the client token.
///
/// The token is `session_id.secret`; the secret never touches the database,
/// and everything stored is sealed with a key derived from it.
///
/// # Errors
///
/// Returns an error if sealing or the database write fails.
pub async fn create_session(
    db: &Database,
    upstream: &UpstreamSession,
    ttl: Duration,
) -> Result<IssuedSession> {
    let mut id_bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut id_bytes);
    let session_id = hex::encode(id_bytes);

    let mut secret = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    let token = format!("{session_id}.{}", hex::encode(secret));

    let key = SessionKey::derive(&secret, &session_id);
    let access_jwt = crypto::seal(&key, upstream.access_jwt.as_bytes())?;
    let refresh_jwt = crypto::seal(&key, upstream.refresh_jwt.as_bytes())?;

    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    db::insert_session(
        db.pool(),
        &NewSession {
            id: session_id,
            user_did: upstream.did.clone(),
            handle: upstream.handle.clone(),
            access_jwt,
            refresh_jwt,
            expires_at: Utc::now().timestamp().saturating_add(ttl_secs),
        },
    )
    .await
    .context("Failed to persist session")?;

    Ok(IssuedSession {
        token,
        user_did: upstream.did.clone(),
        handle: upstream.handle.clone(),
    })
}

/// Authenticate a request from its headers.
///
/// Reconstructs the session key from the token secret, opens the stored
/// JWTs, and transparently refreshes them upstream when the access JWT is
/// about to lapse.
///
/// # Errors
///
/// [`AuthError::Unauthorized`] for anything wrong with the token or session;
/// [`AuthError::Internal`] only for database failures.
pub async fn authorize(
    db: &Database,
    bsky: &BlueskyClient,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = token_from_headers(headers).ok_or(AuthError::Unauthorized)?;
    let (session_id, secret_hex) = token.split_once('.').ok_or(AuthError::Unauthorized)?;
    let secret = hex::decode(secret_hex).map_err(|_| AuthError::Unauthorized)?;

    let now = Utc::now().timestamp();
    let session = db::get_session(db.pool(), session_id, now)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    let key = SessionKey::derive(&secret, session_id);
    let access_jwt =
        crypto::open_string(&key, &session.access_jwt).ok_or(AuthError::Unauthorized)?;
    let refresh_jwt =
        crypto::open_string(&key, &session.refresh_jwt).ok_or(AuthError::Unauthorized)?;
    let did: ActorId = session
        .user_did
        .parse()
        .map_err(|_| AuthError::Unauthorized)?;

    let access_jwt = if jwt_is_stale(&access_jwt, now) {
        match bsky.refresh_session(&refresh_jwt).await {
            Ok(fresh) => {
                store_refreshed_jwts(db, session_id, &key, &fresh).await;
                fresh.access_jwt
            }
            Err(e) => {
                // Refresh is opportunistic while the old JWT still works;
                // once it has actually lapsed the session is over.
                if jwt_expiry(&access_jwt).is_some_and(|exp| exp <= now) {
                    return Err(AuthError::Unauthorized);
                }
                debug!("Upstream session refresh failed, keeping current JWT: {e:#}");
                access_jwt
            }
        }
    } else {
        access_jwt
    };

    Ok(AuthContext {
        session_id: session_id.to_string(),
        did,
        handle: session.handle,
        key,
        access_jwt,
    })
}

/// Best-effort write-back of refreshed JWTs; a failure only means the next
/// request refreshes again.
async fn store_refreshed_jwts(
    db: &Database,
    session_id: &str,
    key: &SessionKey,
    fresh: &UpstreamSession,
) {
    let sealed = crypto::seal(key, fresh.access_jwt.as_bytes())
        .and_then(|access| Ok((access, crypto::seal(key, fresh.refresh_jwt.as_bytes())?)));
    match sealed {
        Ok((access, refresh)) => {
            if let Err(e) =
                db::update_session_jwts(db.pool(), session_id, &access, &refresh).await
            {
                warn!("Failed to store refreshed session JWTs: {e:#}");
            }
        }
        Err(e) => warn!("Failed to seal refreshed session JWTs: {e:#}"),
    }
}

/// Expiry claim of a JWT, without verifying anything else about it; the
/// upstream is the authority, we only use this to refresh proactively.
fn jwt_expiry(jwt: &str) -> Option<i64> {
    let payload = jwt.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp")?.as_i64()
}

fn jwt_is_stale(jwt: &str, now: i64) -> bool {
    jwt_expiry(jwt).is_some_and(|exp| exp - now < JWT_STALE_MARGIN_SECS)
}
