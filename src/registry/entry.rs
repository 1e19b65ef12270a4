//! Stream entry and identifier types
//!
//! This module defines the per-stream state stored in the registry and the
//! identifier newtypes shared across the crate.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a stream, generated at creation and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(Uuid);

impl StreamId {
    /// Generate a fresh stream ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StreamId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Identifier for a live client connection
///
/// Allocated by the connection hub from a monotonic counter. Stream ownership
/// is tied to this identifier: any caller presenting the connection ID that
/// created a stream may stop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audio capture source requested by the client
///
/// Unrecognized labels pass through as `Other` for display only; the server
/// never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AudioSource {
    Microphone,
    System,
    Both,
    Other(String),
}

impl From<String> for AudioSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "microphone" => AudioSource::Microphone,
            "system" => AudioSource::System,
            "both" => AudioSource::Both,
            _ => AudioSource::Other(value),
        }
    }
}

impl From<AudioSource> for String {
    fn from(source: AudioSource) -> Self {
        match source {
            AudioSource::Microphone => "microphone".to_string(),
            AudioSource::System => "system".to_string(),
            AudioSource::Both => "both".to_string(),
            AudioSource::Other(label) => label,
        }
    }
}

impl std::fmt::Display for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioSource::Microphone => write!(f, "microphone"),
            AudioSource::System => write!(f, "system"),
            AudioSource::Both => write!(f, "both"),
            AudioSource::Other(label) => write!(f, "{}", label),
        }
    }
}

/// Parameters for a start-stream request, after wire-level validation
#[derive(Debug, Clone, Default)]
pub struct StreamRequest {
    /// Preferred stream port; allocator probes from the base when absent
    pub port: Option<u16>,
    /// Requested bitrate in kbps; clamped to the configured bounds
    pub bitrate: Option<u32>,
    /// Audio capture source; defaults to microphone
    pub audio_source: Option<AudioSource>,
    /// Optional display name
    pub name: Option<String>,
}

/// A live stream tracked by the registry
///
/// Immutable for its lifetime except for the transient `active` flag, which
/// is cleared during teardown just before the entry leaves the registry.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    /// Opaque unique token
    pub id: StreamId,

    /// Connection that created the stream; authorizes stop requests
    pub owner: ConnectionId,

    /// Network address of the originating connection, informational
    pub client_addr: SocketAddr,

    /// Allocated stream port, unique among live entries
    pub port: u16,

    /// Bitrate in kbps, clamped at creation
    pub bitrate_kbps: u32,

    /// Audio capture source
    pub audio_source: AudioSource,

    /// Optional display name
    pub name: Option<String>,

    /// Creation timestamp, never mutated
    pub started_at: DateTime<Utc>,

    /// Cleared during teardown; the registry never stores inactive entries
    pub active: bool,

    /// Insertion order, for deterministic list snapshots
    pub(crate) seq: u64,
}

impl StreamEntry {
    /// Client-facing view of this entry
    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            id: self.id,
            client_ip: self.client_addr.ip().to_string(),
            port: self.port,
            bitrate: self.bitrate_kbps,
            audio_source: self.audio_source.clone(),
            name: self.name.clone(),
            start_time: self.started_at,
        }
    }
}

/// Client-facing view of a stream, as sent in broadcasts and the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    pub id: StreamId,
    #[serde(rename = "clientIP")]
    pub client_ip: String,
    pub port: u16,
    pub bitrate: u32,
    pub audio_source: AudioSource,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_parses_own_display() {
        let id = StreamId::generate();
        assert_eq!(id.to_string().parse::<StreamId>().unwrap(), id);
        assert!("not-a-uuid".parse::<StreamId>().is_err());
    }

    #[test]
    fn test_audio_source_known_labels() {
        assert_eq!(AudioSource::from("microphone".to_string()), AudioSource::Microphone);
        assert_eq!(AudioSource::from("system".to_string()), AudioSource::System);
        assert_eq!(AudioSource::from("both".to_string()), AudioSource::Both);
    }

    #[test]
    fn test_audio_source_passthrough() {
        let source = AudioSource::from("line-in".to_string());
        assert_eq!(source, AudioSource::Other("line-in".to_string()));
        assert_eq!(String::from(source), "line-in");
    }

    #[test]
    fn test_audio_source_serde() {
        let json = serde_json::to_string(&AudioSource::Microphone).unwrap();
        assert_eq!(json, "\"microphone\"");

        let parsed: AudioSource = serde_json::from_str("\"loopback\"").unwrap();
        assert_eq!(parsed, AudioSource::Other("loopback".to_string()));
    }

    #[test]
    fn test_summary_field_names() {
        let entry = StreamEntry {
            id: StreamId::generate(),
            owner: ConnectionId::new(1),
            client_addr: "192.168.1.50:51234".parse().unwrap(),
            port: 420,
            bitrate_kbps: 128,
            audio_source: AudioSource::System,
            name: Some("desk".to_string()),
            started_at: Utc::now(),
            active: true,
            seq: 0,
        };

        let json = serde_json::to_value(entry.summary()).unwrap();
        assert_eq!(json["clientIP"], "192.168.1.50");
        assert_eq!(json["port"], 420);
        assert_eq!(json["bitrate"], 128);
        assert_eq!(json["audioSource"], "system");
        assert_eq!(json["name"], "desk");
        assert!(json["startTime"].is_string());
    }

    #[test]
    fn test_summary_omits_missing_name() {
        let entry = StreamEntry {
            id: StreamId::generate(),
            owner: ConnectionId::new(2),
            client_addr: "10.0.0.7:40000".parse().unwrap(),
            port: 421,
            bitrate_kbps: 320,
            audio_source: AudioSource::Microphone,
            name: None,
            started_at: Utc::now(),
            active: true,
            seq: 1,
        };

        let json = serde_json::to_value(entry.summary()).unwrap();
        assert!(json.get("name").is_none());
    }
}
