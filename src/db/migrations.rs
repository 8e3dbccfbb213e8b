use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: creating initial schema");

    // Sessions: the upstream JWTs are sealed with a key derived from the
    // client-held token secret, so this table never contains a usable
    // credential on its own.
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_did TEXT NOT NULL,
            handle TEXT NOT NULL,
            access_jwt BLOB NOT NULL,
            refresh_jwt BLOB NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            expires_at INTEGER NOT NULL
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create sessions table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)")
        .execute(pool)
        .await
        .context("Failed to create sessions expiry index")?;

    // Timeline continuations: one row per (user, session, anchor id),
    // value = sealed upstream cursor. Last write wins.
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS timeline_continuations (
            user_did TEXT NOT NULL,
            session_id TEXT NOT NULL,
            anchor_id TEXT NOT NULL,
            cursor BLOB NOT NULL,
            expires_at INTEGER NOT NULL,
            PRIMARY KEY (user_did, session_id, anchor_id)
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create timeline_continuations table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_continuations_expires ON timeline_continuations(expires_at)",
    )
    .execute(pool)
    .await
    .context("Failed to create continuations expiry index")?;

    Ok(())
}
