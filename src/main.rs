use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bluesky_legacy_bridge::auth::{run_cleanup_worker, CleanupConfig};
use bluesky_legacy_bridge::config::Config;
use bluesky_legacy_bridge::continuation::ContinuationStore;
use bluesky_legacy_bridge::db::Database;
use bluesky_legacy_bridge::web;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    init_tracing()?;

    info!("Starting bluesky-legacy-bridge");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        pds = %config.pds_base_url,
        appview = %config.appview_base_url,
        "Configuration loaded"
    );

    // Ensure the database directory exists
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    // Initialize database
    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    let shutdown = CancellationToken::new();

    // Start the expiry sweeper in the background
    let cleanup_db = db.clone();
    let cleanup_store = ContinuationStore::new(db.clone(), config.continuation_ttl);
    let cleanup_config = CleanupConfig {
        interval: config.cleanup_interval,
    };
    let cleanup_shutdown = shutdown.clone();
    let cleanup_handle = tokio::spawn(async move {
        run_cleanup_worker(cleanup_db, cleanup_store, cleanup_config, cleanup_shutdown).await;
    });

    // Start the web server in the background
    let web_config = config.clone();
    let web_db = db.clone();
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(web_config, web_db).await {
            error!("Web server error: {e:#}");
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down...");

    shutdown.cancel();
    web_handle.abort();
    let _ = cleanup_handle.await;

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bluesky_legacy_bridge=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
