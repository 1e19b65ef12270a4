//! UDP broadcast discovery
//!
//! JSON datagrams sent to common broadcast addresses: stream announcements
//! and removals on `web_port + 2`, a periodic service presence beacon on
//! `web_port + 1`. Sends are fire-and-forget; a failed send is logged at
//! debug level and forgotten.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::registry::{AudioSource, StreamEntry, StreamId};

use super::DiscoveryAnnouncer;

/// How often the service presence beacon goes out
const PRESENCE_INTERVAL: Duration = Duration::from_secs(30);

/// Broadcast targets covering the common home-network ranges
const BROADCAST_ADDRESSES: &[&str] = &[
    "255.255.255.255",
    "192.168.1.255",
    "192.168.0.255",
    "10.0.0.255",
];

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
enum Datagram {
    #[serde(rename = "homecast-stream-announcement")]
    StreamAnnouncement {
        stream_id: StreamId,
        #[serde(rename = "clientIP")]
        client_ip: String,
        port: u16,
        bitrate: u32,
        audio_source: AudioSource,
        start_time: DateTime<Utc>,
        timestamp: i64,
    },

    #[serde(rename = "homecast-stream-removal")]
    StreamRemoval { stream_id: StreamId, timestamp: i64 },

    #[serde(rename = "homecast-service")]
    Presence {
        name: String,
        port: u16,
        timestamp: i64,
    },
}

/// Announcer that broadcasts lifecycle events as UDP JSON datagrams
///
/// Events are handed to a background task over an unbounded channel, so the
/// registry never waits on the network. The task also beacons the service's
/// presence every [`PRESENCE_INTERVAL`].
pub struct UdpAnnouncer {
    tx: mpsc::UnboundedSender<Datagram>,
}

impl UdpAnnouncer {
    /// Spawn the sender task and return the announcer handle
    pub fn spawn(service_name: String, web_port: u16) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_sender(service_name, web_port, rx));
        Self { tx }
    }
}

impl DiscoveryAnnouncer for UdpAnnouncer {
    fn stream_started(&self, entry: &StreamEntry) {
        let _ = self.tx.send(Datagram::StreamAnnouncement {
            stream_id: entry.id,
            client_ip: entry.client_addr.ip().to_string(),
            port: entry.port,
            bitrate: entry.bitrate_kbps,
            audio_source: entry.audio_source.clone(),
            start_time: entry.started_at,
            timestamp: Utc::now().timestamp_millis(),
        });
    }

    fn stream_removed(&self, id: &StreamId) {
        let _ = self.tx.send(Datagram::StreamRemoval {
            stream_id: *id,
            timestamp: Utc::now().timestamp_millis(),
        });
    }
}

async fn run_sender(
    service_name: String,
    web_port: u16,
    mut rx: mpsc::UnboundedReceiver<Datagram>,
) {
    let socket = match UdpSocket::bind(("0.0.0.0", 0)).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!(error = %e, "Discovery socket unavailable, announcements disabled");
            // Drain events so senders never observe a closed channel.
            while rx.recv().await.is_some() {}
            return;
        }
    };
    if let Err(e) = socket.set_broadcast(true) {
        tracing::warn!(error = %e, "Failed to enable UDP broadcast");
    }

    tracing::info!(service = %service_name, "Discovery announcer started");

    let mut ticker = tokio::time::interval(PRESENCE_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let beacon = Datagram::Presence {
                    name: service_name.clone(),
                    port: web_port,
                    timestamp: Utc::now().timestamp_millis(),
                };
                send_datagram(&socket, &beacon, web_port + 1).await;
            }
            event = rx.recv() => match event {
                Some(datagram) => send_datagram(&socket, &datagram, web_port + 2).await,
                None => break,
            },
        }
    }

    tracing::debug!("Discovery announcer stopped");
}

async fn send_datagram(socket: &UdpSocket, datagram: &Datagram, port: u16) {
    let payload = match serde_json::to_vec(datagram) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to encode discovery datagram");
            return;
        }
    };

    for address in BROADCAST_ADDRESSES {
        if let Err(e) = socket.send_to(&payload, (*address, port)).await {
            // Expected for address ranges this network doesn't have
            tracing::debug!(target = %address, error = %e, "Discovery send failed");
        }
    }
}
