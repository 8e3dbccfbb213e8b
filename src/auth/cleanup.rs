//! Background cleanup worker for expired sessions and timeline
//! continuations.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::continuation::ContinuationStore;
use crate::db::Database;

/// Cleanup configuration.
pub struct CleanupConfig {
    /// Interval between cleanup runs.
    pub interval: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Run a single cleanup cycle.
async fn cleanup_once(db: &Database, store: &ContinuationStore) {
    match crate::db::delete_expired_sessions(db.pool(), Utc::now().timestamp()).await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(expired_sessions = count, "Cleaned up expired sessions");
            }
        }
        Err(e) => {
            tracing::error!("Failed to delete expired sessions: {e}");
        }
    }

    match store.sweep().await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(
                    expired_continuations = count,
                    "Cleaned up expired timeline continuations"
                );
            }
        }
        Err(e) => {
            tracing::error!("Failed to sweep timeline continuations: {e}");
        }
    }
}

/// Run the cleanup worker.
/// This task runs cleanup immediately on start, then at the configured
/// interval. It respects the cancellation token for graceful shutdown.
pub async fn run_cleanup_worker(
    db: Database,
    store: ContinuationStore,
    config: CleanupConfig,
    shutdown: CancellationToken,
) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Starting cleanup worker"
    );

    // Run immediately on startup
    cleanup_once(&db, &store).await;

    let mut interval = tokio::time::interval(config.interval);
    interval.tick().await; // Skip the first immediate tick (we already ran cleanup)

    loop {
        tokio::select! {
            _ = interval.tick() => {
                cleanup_once(&db, &store).await;
            }
            _ = shutdown.cancelled() => {
                tracing::info!("Cleanup worker shutting down");
                break;
            }
        }
    }
}
