mod handlers;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bluesky::BlueskyClient;
use crate::config::Config;
use crate::continuation::ContinuationStore;
use crate::db::Database;
use crate::timeline::TimelineBridge;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub bsky: BlueskyClient,
    pub timeline: TimelineBridge,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, db: Database) -> Self {
        let bsky = BlueskyClient::new(&config.pds_base_url, &config.appview_base_url);
        let store = ContinuationStore::new(db.clone(), config.continuation_ttl);
        let timeline = TimelineBridge::new(bsky.clone(), store);

        Self {
            db,
            config: Arc::new(config),
            bsky,
            timeline,
        }
    }
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(config: Config, db: Database) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let state = AppState::new(config, db);
    let app = create_app(state);

    info!(addr = %addr, "Starting web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
#[must_use]
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
