use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{NewSession, Session};

// ========== Sessions ==========

/// Insert a new session row.
pub async fn insert_session(pool: &SqlitePool, session: &NewSession) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO sessions (id, user_did, handle, access_jwt, refresh_jwt, expires_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&session.id)
    .bind(&session.user_did)
    .bind(&session.handle)
    .bind(&session.access_jwt)
    .bind(&session.refresh_jwt)
    .bind(session.expires_at)
    .execute(pool)
    .await
    .context("Failed to insert session")?;

    Ok(())
}

/// Get a session by ID, provided it has not expired.
pub async fn get_session(pool: &SqlitePool, id: &str, now: i64) -> Result<Option<Session>> {
    sqlx::query_as("SELECT * FROM sessions WHERE id = ? AND expires_at > ?")
        .bind(id)
        .bind(now)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch session")
}

/// Replace the sealed JWTs of an existing session (after an upstream
/// token refresh).
pub async fn update_session_jwts(
    pool: &SqlitePool,
    id: &str,
    access_jwt: &[u8],
    refresh_jwt: &[u8],
) -> Result<()> {
    sqlx::query("UPDATE sessions SET access_jwt = ?, refresh_jwt = ? WHERE id = ?")
        .bind(access_jwt)
        .bind(refresh_jwt)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update session JWTs")?;

    Ok(())
}

/// Delete expired sessions, returning how many were removed.
pub async fn delete_expired_sessions(pool: &SqlitePool, now: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

// ========== Timeline continuations ==========

/// Write a continuation record, replacing any prior record under the same
/// (user, session, anchor) key.
pub async fn upsert_continuation(
    pool: &SqlitePool,
    user_did: &str,
    session_id: &str,
    anchor_id: &str,
    cursor: &[u8],
    expires_at: i64,
) -> Result<()> {
    sqlx::query(
        r"
        INSERT OR REPLACE INTO timeline_continuations
            (user_did, session_id, anchor_id, cursor, expires_at)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(user_did)
    .bind(session_id)
    .bind(anchor_id)
    .bind(cursor)
    .bind(expires_at)
    .execute(pool)
    .await
    .context("Failed to upsert continuation")?;

    Ok(())
}

/// Fetch the sealed cursor for an anchor, provided it has not expired.
/// The record stays in place: a client may retry the same page.
pub async fn get_continuation(
    pool: &SqlitePool,
    user_did: &str,
    session_id: &str,
    anchor_id: &str,
    now: i64,
) -> Result<Option<Vec<u8>>> {
    let row: Option<(Vec<u8>,)> = sqlx::query_as(
        r"
        SELECT cursor FROM timeline_continuations
        WHERE user_did = ? AND session_id = ? AND anchor_id = ? AND expires_at > ?
        ",
    )
    .bind(user_did)
    .bind(session_id)
    .bind(anchor_id)
    .bind(now)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch continuation")?;

    Ok(row.map(|(cursor,)| cursor))
}

/// Delete expired continuation records, returning how many were removed.
pub async fn delete_expired_continuations(pool: &SqlitePool, now: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM timeline_continuations WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired continuations")?;

    Ok(result.rows_affected())
}
