//! Registry error types

use super::entry::{ConnectionId, StreamId};

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// No entry with this ID is live
    #[error("stream not found: {0}")]
    StreamNotFound(StreamId),

    /// The requesting connection did not create this stream
    #[error("stream {0} is not owned by connection {1}")]
    NotOwner(StreamId, ConnectionId),

    /// Every port in the valid range is held by a live stream
    #[error("no stream ports available")]
    PortSpaceExhausted,
}
