//! Audio dashboard server binary
//!
//! Configuration comes from `HOMECAST_*` environment variables; see
//! [`homecast::ServerConfig::from_env`]. Log verbosity follows `RUST_LOG`.

use std::sync::Arc;

use homecast::discovery::{DiscoveryAnnouncer, NoopAnnouncer, UdpAnnouncer};
use homecast::{server, ServerConfig};

#[tokio::main]
async fn main() -> homecast::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("homecast=info")),
        )
        .init();

    let config = ServerConfig::from_env();

    tracing::info!(
        web_port = config.web_port,
        default_stream_port = config.default_stream_port,
        min_bitrate = config.min_bitrate,
        max_bitrate = config.max_bitrate,
        discovery = config.discovery_enabled,
        "Starting audio dashboard server"
    );

    let announcer: Arc<dyn DiscoveryAnnouncer> = if config.discovery_enabled {
        Arc::new(UdpAnnouncer::spawn(
            config.service_name.clone(),
            config.web_port,
        ))
    } else {
        Arc::new(NoopAnnouncer)
    };

    server::run(config, announcer).await
}
