//! HTTP and WebSocket server
//!
//! Wires the registry, hub, and level relay into an axum router and runs it
//! with graceful shutdown.

mod routes;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{PublicConfig, ServerConfig};
use crate::discovery::DiscoveryAnnouncer;
use crate::error::Result;
use crate::hub::ConnectionHub;
use crate::levels::LevelRelay;
use crate::registry::StreamRegistry;

/// Shared state passed to all request handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<ConnectionHub>,
    pub registry: Arc<StreamRegistry>,
    pub levels: Arc<LevelRelay>,
    pub config: ServerConfig,
    pub started_at: Instant,
}

impl AppState {
    /// Assemble the shared state from a configuration and an announcer
    pub fn new(config: ServerConfig, announcer: Arc<dyn DiscoveryAnnouncer>) -> Self {
        let registry = Arc::new(StreamRegistry::with_announcer((&config).into(), announcer));
        let levels = Arc::new(LevelRelay::new());
        let hub = Arc::new(ConnectionHub::new(
            Arc::clone(&registry),
            Arc::clone(&levels),
        ));

        Self {
            hub,
            registry,
            levels,
            config,
            started_at: Instant::now(),
        }
    }

    /// Client-visible configuration, merging static settings with the
    /// registry's current limits
    pub async fn public_config(&self) -> PublicConfig {
        let limits = self.registry.config_snapshot().await;
        PublicConfig {
            web_port: self.config.web_port,
            default_stream_port: limits.default_stream_port,
            max_bitrate: limits.max_bitrate,
            min_bitrate: limits.min_bitrate,
            sample_rate: self.config.sample_rate,
            channels: self.config.channels,
        }
    }
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/streams", get(routes::get_streams))
        .route("/api/config", get(routes::get_config))
        .route("/api/levels", get(routes::get_levels))
        .route("/health", get(routes::health))
        .route("/ws", get(ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the server until ctrl-c
pub async fn run(config: ServerConfig, announcer: Arc<dyn DiscoveryAnnouncer>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.web_port));
    let state = AppState::new(config, announcer);
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Audio dashboard server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
