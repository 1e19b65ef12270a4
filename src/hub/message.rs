//! Wire protocol messages
//!
//! Typed JSON frames with a `type` tag. Message names are kebab-case, field
//! names camelCase, matching the browser dashboard clients.

use serde::{Deserialize, Serialize};

use crate::config::PublicConfig;
use crate::registry::{AudioSource, LimitUpdate, StreamId, StreamSummary};

/// Client-to-server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Request a new stream; all parameters are optional
    StartStream {
        #[serde(default)]
        audio_source: Option<AudioSource>,
        #[serde(default)]
        bitrate: Option<u32>,
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        name: Option<String>,
    },

    /// Stop a stream this connection created
    ///
    /// The ID is carried as an opaque token: one that never named a stream
    /// is indistinguishable from one whose stream is already gone, and both
    /// take the idempotent path.
    StopStream { stream_id: String },

    /// Report the current loudness of an owned stream
    AudioLevel {
        stream_id: StreamId,
        level: f32,
        db: f32,
    },

    /// Adjust the runtime-tunable server limits
    UpdateConfig(LimitUpdate),
}

/// Server-to-client messages: direct acknowledgments and hub broadcasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Greeting pushed to every new connection
    Config { config: PublicConfig },

    /// Ack: the requested stream is live
    StreamStarted {
        stream_id: StreamId,
        port: u16,
        config: StreamSummary,
    },

    /// Ack: the stream is gone (idempotent; also sent for unknown IDs,
    /// echoing the token as received)
    StreamStopped { stream_id: String },

    /// Broadcast: full snapshot of live streams
    StreamListUpdated { streams: Vec<StreamSummary> },

    /// Broadcast: loudness sample for one stream
    AudioLevelUpdate {
        stream_id: StreamId,
        level: f32,
        db: f32,
    },

    /// Ack: the subset of a limits update that passed validation
    ConfigUpdated(LimitUpdate),

    /// Ack: the request failed; no state changed
    Error { message: String },
}
