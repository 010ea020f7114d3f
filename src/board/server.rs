use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use super::api::{self, AppState};
use super::events::WsBroadcaster;
use super::store::{BoardStore, DataDirLock, StoreHandle};
use super::suggest::Suggester;
use super::ws;
use crate::config::{MissionConfig, SuggestionSettings};

/// Buffered events per subscriber before a slow client starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Configuration for the board server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub task_prefix: String,
    pub dev_mode: bool,
    pub suggestions: SuggestionSettings,
}

impl From<&MissionConfig> for ServerConfig {
    fn from(config: &MissionConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            data_dir: config.storage.data_dir.clone(),
            task_prefix: config.board.task_prefix.clone(),
            dev_mode: config.server.dev,
            suggestions: config.suggestions.clone(),
        }
    }
}

impl ServerConfig {
    /// Dev mode listens on every interface so a UI dev server in a
    /// container or VM can reach the API.
    pub fn bind_host(&self) -> &str {
        if self.dev_mode { "0.0.0.0" } else { &self.host }
    }
}

/// Build the full application router: REST API plus the event socket.
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_tx = state.ws_tx.clone();

    api::api_router()
        .route(
            "/ws",
            get(move |ws_upgrade| ws::ws_handler(ws_upgrade, ws_tx)),
        )
        .with_state(state)
}

/// Start the board server and run until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let _lock = DataDirLock::acquire(&config.data_dir)?;

    let (ws_tx, _rx) = broadcast::channel::<String>(EVENT_CHANNEL_CAPACITY);
    let events = Arc::new(WsBroadcaster::new(ws_tx.clone()));
    let store = BoardStore::open(&config.data_dir, &config.task_prefix, events)
        .with_context(|| format!("Failed to open board data in {}", config.data_dir.display()))?;
    let suggester = Suggester::from_settings(&config.suggestions)?;
    if !suggester.is_enabled() {
        tracing::warn!("no text-generation key configured; upgrade generation is disabled");
    }

    let state = Arc::new(AppState {
        store: StoreHandle::new(store),
        ws_tx,
        suggester,
    });

    let mut app = build_router(state);
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.bind_host(), config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        addr = %local_addr,
        data_dir = %config.data_dir.display(),
        dev = config.dev_mode,
        "mission control listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C; shutting down");
        return;
    }
    tracing::info!("shutdown requested");
}
