//! homecast: LAN audio streaming dashboard server
//!
//! Browser clients connect over a WebSocket, request audio streams (the
//! server allocates a port per stream and tracks it), report live loudness
//! levels, and receive fan-out notifications about every other client's
//! streams. A read-only HTTP API serves the same state to polling clients,
//! and stream lifecycle events are announced to the local network over UDP
//! broadcast.
//!
//! # Architecture
//!
//! ```text
//!   WebSocket clients          HTTP clients
//!        │                          │
//!        ▼                          ▼
//!   server::ws  ◄─ broadcasts ─  server::routes
//!        │                          │
//!        ▼                          │ (read-only)
//!   ConnectionHub ──────────────────┤
//!        │ create/remove            │
//!        ▼                          ▼
//!   StreamRegistry ──────────► LevelRelay
//!        │
//!        ▼ fire-and-forget
//!   DiscoveryAnnouncer (UDP broadcast)
//! ```
//!
//! The registry is the only owner of the stream map and the port set; the
//! hub reaches them exclusively through the registry's contract.

pub mod config;
pub mod discovery;
pub mod error;
pub mod hub;
pub mod levels;
pub mod registry;
pub mod server;

pub use config::{PublicConfig, ServerConfig};
pub use discovery::{DiscoveryAnnouncer, NoopAnnouncer, UdpAnnouncer};
pub use error::{Error, Result};
pub use hub::{ClientMessage, ConnectionHub, ServerMessage};
pub use levels::{LevelRelay, LevelSample};
pub use registry::{
    AudioSource, ConnectionId, RegistryError, StreamEntry, StreamId, StreamRegistry, StreamRequest,
    StreamSummary,
};
