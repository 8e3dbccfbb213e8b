//! The pagination cursor bridge.
//!
//! The upstream paginates with opaque forward cursors; legacy clients
//! paginate with "everything older than ID X". Every served page records,
//! under the bridged identifier of its oldest item, the sealed cursor that
//! fetches the next page — so when a client later asks for `max_id = X`,
//! the stored cursor resumes the upstream listing where that page ended.
//!
//! Lookups are best effort by design. A miss, an expired record, a failed
//! decryption, or an unreachable store all read as "no continuation", and
//! the caller falls back to fetching the timeline from the start.

use std::time::Duration;

use chrono::Utc;
use num_bigint::BigUint;
use thiserror::Error;
use tracing::debug;

use crate::crypto::{self, SessionKey};
use crate::db::{self, Database};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("continuation store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct ContinuationStore {
    db: Database,
    ttl: Duration,
}

impl ContinuationStore {
    #[must_use]
    pub fn new(db: Database, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Record the cursor that continues past `anchor`, replacing any prior
    /// record under the same key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the backing store cannot be
    /// written. Callers log and keep serving the page; only the *next*
    /// pagination request degrades, and that degradation is the defined
    /// fallback path anyway.
    pub async fn put(
        &self,
        user_did: &str,
        session_id: &str,
        anchor: &BigUint,
        cursor: &str,
        key: &SessionKey,
    ) -> Result<(), StoreError> {
        let sealed = crypto::seal(key, cursor.as_bytes()).map_err(StoreError::Unavailable)?;
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl_secs);

        db::upsert_continuation(
            self.db.pool(),
            user_did,
            session_id,
            &anchor.to_string(),
            &sealed,
            expires_at,
        )
        .await
        .map_err(StoreError::Unavailable)
    }

    /// Look up the cursor stored under `anchor`. Absent, expired,
    /// undecryptable, and unreadable records are all `None`.
    pub async fn get(
        &self,
        user_did: &str,
        session_id: &str,
        anchor: &BigUint,
        key: &SessionKey,
    ) -> Option<String> {
        let now = Utc::now().timestamp();
        let sealed = match db::get_continuation(
            self.db.pool(),
            user_did,
            session_id,
            &anchor.to_string(),
            now,
        )
        .await
        {
            Ok(Some(sealed)) => sealed,
            Ok(None) => return None,
            Err(e) => {
                debug!("Continuation lookup failed, treating as miss: {e:#}");
                return None;
            }
        };

        let cursor = crypto::open_string(key, &sealed);
        if cursor.is_none() {
            debug!(anchor = %anchor, "Stored continuation did not decrypt, treating as miss");
        }
        cursor
    }

    /// Delete expired records. Run periodically by the cleanup worker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the backing store cannot be
    /// reached.
    pub async fn sweep(&self) -> Result<u64, StoreError> {
        db::delete_expired_continuations(self.db.pool(), Utc::now().timestamp())
            .await
            .map_err(StoreError::Unavailable)
    }
}
