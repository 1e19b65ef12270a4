//! Stream registry and lifecycle coordination
//!
//! The registry is the single source of truth for "what streams exist right
//! now". It maps stream IDs to their owning connection and metadata, hands
//! out unique stream ports, and reports lifecycle events to the discovery
//! announcer.
//!
//! # Architecture
//!
//! ```text
//!                    Arc<StreamRegistry>
//!              ┌──────────────────────────────┐
//!              │ RwLock<Inner> {              │
//!              │   streams: HashMap<StreamId, │
//!              │     StreamEntry { owner,     │
//!              │       port, bitrate, ... }>, │
//!              │   config: RegistryConfig,    │
//!              │ }                            │
//!              └──────┬────────────────┬──────┘
//!                     │                │
//!            create / remove     stream_started /
//!            (Connection Hub)    stream_removed
//!                     │          (DiscoveryAnnouncer)
//! ```
//!
//! Every mutation returns a stream-list snapshot taken inside the write-lock
//! critical section; the hub broadcasts that snapshot, so all observers see
//! one serialized sequence of states per stream (create, then level updates,
//! then remove), never out of order.

pub mod config;
pub mod entry;
pub mod error;
pub mod ports;
pub mod store;

pub use config::{LimitUpdate, RegistryConfig, DEFAULT_BITRATE_KBPS};
pub use entry::{AudioSource, ConnectionId, StreamEntry, StreamId, StreamRequest, StreamSummary};
pub use error::RegistryError;
pub use ports::{PortAllocator, MIN_DYNAMIC_PORT};
pub use store::StreamRegistry;
