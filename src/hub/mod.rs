//! Connection hub: message dispatch and broadcast fan-out
//!
//! The hub owns the set of live connections. Each connection gets a unique ID
//! and a receiver on the shared broadcast channel; client requests are
//! dispatched into the registry through the typed handlers below, and
//! registry-change notifications fan out to every connection. Delivery is
//! best-effort and at-most-once per connection per event: a lagging receiver
//! drops messages without slowing anyone else down, and a failed delivery
//! never rolls back registry state.
//!
//! Registry mutation and broadcast enqueue happen under one ordering lock,
//! so list snapshots reach the channel in the order they were taken and no
//! connection can observe a newer list followed by an older one.
//!
//! The hub never touches the stream map or the port set directly; all
//! mutations go through the registry's contract.

pub mod message;

pub use message::{ClientMessage, ServerMessage};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::levels::LevelRelay;
use crate::registry::{
    ConnectionId, LimitUpdate, RegistryError, StreamId, StreamRegistry, StreamRequest,
};

/// Fan-out channel depth; lagging dashboards skip ahead past this many events
const BROADCAST_CAPACITY: usize = 64;

/// Manages live connections and routes their requests into the registry
pub struct ConnectionHub {
    registry: Arc<StreamRegistry>,
    levels: Arc<LevelRelay>,
    events: broadcast::Sender<ServerMessage>,
    next_connection_id: AtomicU64,
    /// Held across mutate-then-send; see the module docs
    publish_order: Mutex<()>,
}

impl ConnectionHub {
    pub fn new(registry: Arc<StreamRegistry>, levels: Arc<LevelRelay>) -> Self {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            registry,
            levels,
            events,
            next_connection_id: AtomicU64::new(1),
            publish_order: Mutex::new(()),
        }
    }

    /// Register a new connection: allocate its ID and subscribe it to
    /// hub broadcasts
    pub fn register_connection(&self) -> (ConnectionId, broadcast::Receiver<ServerMessage>) {
        let id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        (id, self.events.subscribe())
    }

    /// Route one client message to its handler
    ///
    /// Returns the direct acknowledgment for the requester, if the message
    /// type has one. Broadcasts to all connections happen internally.
    pub async fn dispatch(
        &self,
        connection: ConnectionId,
        client_addr: SocketAddr,
        message: ClientMessage,
    ) -> Option<ServerMessage> {
        match message {
            ClientMessage::StartStream {
                audio_source,
                bitrate,
                port,
                name,
            } => {
                let request = StreamRequest {
                    port,
                    bitrate,
                    audio_source,
                    name,
                };
                Some(self.on_start_stream(connection, client_addr, request).await)
            }
            ClientMessage::StopStream { stream_id } => match stream_id.parse::<StreamId>() {
                Ok(id) => Some(self.on_stop_stream(connection, id).await),
                // A token that never named a stream stops nothing, which
                // already succeeded.
                Err(_) => Some(ServerMessage::StreamStopped { stream_id }),
            },
            ClientMessage::AudioLevel {
                stream_id,
                level,
                db,
            } => {
                self.on_level_update(connection, stream_id, level, db).await;
                None
            }
            ClientMessage::UpdateConfig(update) => {
                Some(self.on_update_config(connection, update).await)
            }
        }
    }

    /// Handle a start-stream request
    ///
    /// Success acks the requester and broadcasts the updated list; failure
    /// acks the requester only, with no broadcast and no state change.
    pub async fn on_start_stream(
        &self,
        connection: ConnectionId,
        client_addr: SocketAddr,
        request: StreamRequest,
    ) -> ServerMessage {
        let _order = self.publish_order.lock().await;
        match self.registry.create(connection, client_addr, request).await {
            Ok((entry, streams)) => {
                self.broadcast(ServerMessage::StreamListUpdated { streams });
                ServerMessage::StreamStarted {
                    stream_id: entry.id,
                    port: entry.port,
                    config: entry.summary(),
                }
            }
            Err(e) => {
                tracing::warn!(connection = %connection, error = %e, "Start-stream rejected");
                ServerMessage::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Handle a stop-stream request
    ///
    /// Idempotent from the caller's perspective: stopping an unknown stream
    /// still acks `stream-stopped`. The list broadcast goes out only when an
    /// entry was actually removed. Stopping another connection's stream is
    /// distinguishable and gets an error ack.
    pub async fn on_stop_stream(
        &self,
        connection: ConnectionId,
        stream_id: StreamId,
    ) -> ServerMessage {
        let _order = self.publish_order.lock().await;
        match self.registry.remove(stream_id, connection).await {
            Ok((_, streams)) => {
                self.levels.forget(&stream_id).await;
                self.broadcast(ServerMessage::StreamListUpdated { streams });
                ServerMessage::StreamStopped {
                    stream_id: stream_id.to_string(),
                }
            }
            Err(RegistryError::StreamNotFound(_)) => ServerMessage::StreamStopped {
                stream_id: stream_id.to_string(),
            },
            Err(e) => {
                tracing::warn!(connection = %connection, stream = %stream_id, error = %e, "Stop-stream rejected");
                ServerMessage::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Handle a level report for an owned stream
    ///
    /// Silently dropped when the stream is unknown or owned by someone else;
    /// a stale report arriving after stop is expected, not an error.
    pub async fn on_level_update(
        &self,
        connection: ConnectionId,
        stream_id: StreamId,
        level: f32,
        db: f32,
    ) {
        // Under the ordering lock the liveness check cannot interleave with
        // a concurrent stop's remove-and-forget, so no sample outlives its
        // stream in the relay cache.
        let _order = self.publish_order.lock().await;
        if self.registry.owner_of(stream_id).await != Some(connection) {
            tracing::trace!(connection = %connection, stream = %stream_id, "Dropping unowned level update");
            return;
        }

        let sample = self.levels.publish(stream_id, level, db).await;
        self.broadcast(ServerMessage::AudioLevelUpdate {
            stream_id,
            level: sample.level,
            db: sample.db,
        });
    }

    /// Handle a runtime limits update
    pub async fn on_update_config(
        &self,
        connection: ConnectionId,
        update: LimitUpdate,
    ) -> ServerMessage {
        let applied = self.registry.update_limits(update).await;
        tracing::info!(connection = %connection, ?applied, "Configuration updated");
        ServerMessage::ConfigUpdated(applied)
    }

    /// Tear down a terminated connection
    ///
    /// Removes exactly the streams it owned and broadcasts the updated list
    /// to the remaining connections, but only when something was removed.
    pub async fn on_disconnect(&self, connection: ConnectionId) {
        let _order = self.publish_order.lock().await;
        let (removed, streams) = self.registry.remove_all_for(connection).await;
        if removed.is_empty() {
            return;
        }

        for entry in &removed {
            self.levels.forget(&entry.id).await;
        }
        self.broadcast(ServerMessage::StreamListUpdated { streams });
    }

    fn broadcast(&self, message: ServerMessage) {
        // Err means no live receivers, which is fine
        let _ = self.events.send(message);
    }
}
