//! Stream registry implementation
//!
//! The central registry owns the only shared mutable state in the server:
//! the map of live streams and, through it, the set of reserved ports. All
//! mutations are serialized behind one write lock, and every mutation returns
//! a stream-list snapshot taken inside the critical section so broadcasts can
//! never show a half-removed state. Discovery announcements happen after the
//! lock is released and are fire-and-forget.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::discovery::{DiscoveryAnnouncer, NoopAnnouncer};

use super::config::{LimitUpdate, RegistryConfig, DEFAULT_BITRATE_KBPS};
use super::entry::{AudioSource, ConnectionId, StreamEntry, StreamId, StreamRequest, StreamSummary};
use super::error::RegistryError;
use super::ports::PortAllocator;

/// Authoritative mapping of live streams to their owning connections
pub struct StreamRegistry {
    inner: RwLock<Inner>,
    announcer: Arc<dyn DiscoveryAnnouncer>,
}

struct Inner {
    streams: HashMap<StreamId, StreamEntry>,
    config: RegistryConfig,
    next_seq: u64,
}

impl Inner {
    fn ports_in_use(&self) -> HashSet<u16> {
        self.streams.values().map(|entry| entry.port).collect()
    }

    /// Snapshot in insertion order, taken under the lock
    fn snapshot(&self) -> Vec<StreamSummary> {
        let mut entries: Vec<&StreamEntry> = self.streams.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.iter().map(|entry| entry.summary()).collect()
    }
}

impl StreamRegistry {
    /// Create a registry with default configuration and no discovery
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration and no discovery
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::with_announcer(config, Arc::new(NoopAnnouncer))
    }

    /// Create a registry that reports lifecycle events to `announcer`
    pub fn with_announcer(config: RegistryConfig, announcer: Arc<dyn DiscoveryAnnouncer>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                streams: HashMap::new(),
                config,
                next_seq: 0,
            }),
            announcer,
        }
    }

    /// Create a stream for `owner`
    ///
    /// The requested bitrate is clamped, never rejected. The requested port
    /// is a preference only; the allocator probes from the configured base
    /// when it is absent or taken. Fails only on port-space exhaustion.
    ///
    /// Returns the new entry plus a stream-list snapshot consistent with the
    /// insertion.
    pub async fn create(
        &self,
        owner: ConnectionId,
        client_addr: SocketAddr,
        request: StreamRequest,
    ) -> Result<(StreamEntry, Vec<StreamSummary>), RegistryError> {
        let mut inner = self.inner.write().await;

        let bitrate = inner
            .config
            .clamp_bitrate(request.bitrate.unwrap_or(DEFAULT_BITRATE_KBPS));
        let allocator = PortAllocator::new(inner.config.default_stream_port);
        let port = allocator.allocate(&inner.ports_in_use(), request.port)?;

        let entry = StreamEntry {
            id: StreamId::generate(),
            owner,
            client_addr,
            port,
            bitrate_kbps: bitrate,
            audio_source: request.audio_source.unwrap_or(AudioSource::Microphone),
            name: request.name,
            started_at: Utc::now(),
            active: true,
            seq: inner.next_seq,
        };
        inner.next_seq += 1;
        inner.streams.insert(entry.id, entry.clone());

        let snapshot = inner.snapshot();
        drop(inner);

        self.announcer.stream_started(&entry);

        tracing::info!(
            stream = %entry.id,
            connection = %owner,
            port = entry.port,
            bitrate_kbps = bitrate,
            source = %entry.audio_source,
            "Stream started"
        );

        Ok((entry, snapshot))
    }

    /// Remove a stream, authorized by ownership
    ///
    /// Only the connection that created an entry may remove it. Removal frees
    /// the port implicitly and triggers a discovery removal.
    pub async fn remove(
        &self,
        id: StreamId,
        requester: ConnectionId,
    ) -> Result<(StreamEntry, Vec<StreamSummary>), RegistryError> {
        let mut inner = self.inner.write().await;

        let owner = match inner.streams.get(&id) {
            Some(entry) => entry.owner,
            None => return Err(RegistryError::StreamNotFound(id)),
        };
        if owner != requester {
            return Err(RegistryError::NotOwner(id, requester));
        }

        let mut entry = inner
            .streams
            .remove(&id)
            .ok_or(RegistryError::StreamNotFound(id))?;
        entry.active = false;

        let snapshot = inner.snapshot();
        drop(inner);

        self.announcer.stream_removed(&id);

        tracing::info!(stream = %id, connection = %requester, "Stream stopped");

        Ok((entry, snapshot))
    }

    /// Remove every stream owned by `connection`
    ///
    /// Used on disconnect. The removals and the returned snapshot happen in
    /// one critical section, so no observer sees a partially cleaned state.
    pub async fn remove_all_for(
        &self,
        connection: ConnectionId,
    ) -> (Vec<StreamEntry>, Vec<StreamSummary>) {
        let mut inner = self.inner.write().await;

        let owned: Vec<StreamId> = inner
            .streams
            .values()
            .filter(|entry| entry.owner == connection)
            .map(|entry| entry.id)
            .collect();

        let mut removed = Vec::with_capacity(owned.len());
        for id in owned {
            if let Some(mut entry) = inner.streams.remove(&id) {
                entry.active = false;
                removed.push(entry);
            }
        }

        let snapshot = inner.snapshot();
        drop(inner);

        for entry in &removed {
            self.announcer.stream_removed(&entry.id);
            tracing::info!(
                stream = %entry.id,
                connection = %connection,
                "Stream removed for disconnected connection"
            );
        }

        (removed, snapshot)
    }

    /// Live entries in insertion order
    pub async fn list(&self) -> Vec<StreamEntry> {
        let inner = self.inner.read().await;
        let mut entries: Vec<StreamEntry> = inner.streams.values().cloned().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
    }

    /// Client-facing snapshot in insertion order
    pub async fn summaries(&self) -> Vec<StreamSummary> {
        self.inner.read().await.snapshot()
    }

    /// Number of live streams
    pub async fn stream_count(&self) -> usize {
        self.inner.read().await.streams.len()
    }

    /// Owner of a live stream, if any
    pub async fn owner_of(&self, id: StreamId) -> Option<ConnectionId> {
        self.inner.read().await.streams.get(&id).map(|e| e.owner)
    }

    /// Current configuration
    pub async fn config_snapshot(&self) -> RegistryConfig {
        self.inner.read().await.config.clone()
    }

    /// Apply a runtime limits update, returning the applied subset
    pub async fn update_limits(&self, update: LimitUpdate) -> LimitUpdate {
        let mut inner = self.inner.write().await;
        inner.config.apply(&update)
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn client_addr() -> SocketAddr {
        "192.168.1.50:51234".parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let registry = StreamRegistry::new();

        let (entry, snapshot) = registry
            .create(ConnectionId::new(1), client_addr(), StreamRequest::default())
            .await
            .unwrap();

        assert_eq!(entry.bitrate_kbps, 128);
        assert_eq!(entry.audio_source, AudioSource::Microphone);
        assert_eq!(entry.port, 420);
        assert!(entry.active);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, entry.id);
    }

    #[tokio::test]
    async fn test_create_clamps_bitrate() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(1);

        let (high, _) = registry
            .create(
                conn,
                client_addr(),
                StreamRequest {
                    bitrate: Some(1000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(high.bitrate_kbps, 320);

        let (low, _) = registry
            .create(
                conn,
                client_addr(),
                StreamRequest {
                    bitrate: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(low.bitrate_kbps, 64);
    }

    #[tokio::test]
    async fn test_ports_unique_across_creates() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(1);

        let mut seen = HashSet::new();
        for _ in 0..10 {
            let (entry, _) = registry
                .create(conn, client_addr(), StreamRequest::default())
                .await
                .unwrap();
            assert!(seen.insert(entry.port), "port {} allocated twice", entry.port);
        }
    }

    #[tokio::test]
    async fn test_preferred_port_conflict_reallocates() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(1);
        let request = StreamRequest {
            port: Some(5000),
            ..Default::default()
        };

        let (first, _) = registry
            .create(conn, client_addr(), request.clone())
            .await
            .unwrap();
        let (second, _) = registry.create(conn, client_addr(), request).await.unwrap();

        assert_eq!(first.port, 5000);
        assert_ne!(second.port, 5000);
    }

    #[tokio::test]
    async fn test_port_freed_on_remove() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(1);

        let (entry, _) = registry
            .create(conn, client_addr(), StreamRequest::default())
            .await
            .unwrap();
        registry.remove(entry.id, conn).await.unwrap();

        let (next, _) = registry
            .create(conn, client_addr(), StreamRequest::default())
            .await
            .unwrap();
        assert_eq!(next.port, entry.port);
    }

    #[tokio::test]
    async fn test_remove_unknown_stream() {
        let registry = StreamRegistry::new();

        let result = registry
            .remove(StreamId::generate(), ConnectionId::new(1))
            .await;
        assert!(matches!(result, Err(RegistryError::StreamNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_requires_ownership() {
        let registry = StreamRegistry::new();
        let owner = ConnectionId::new(1);
        let intruder = ConnectionId::new(2);

        let (entry, _) = registry
            .create(owner, client_addr(), StreamRequest::default())
            .await
            .unwrap();

        let result = registry.remove(entry.id, intruder).await;
        assert!(matches!(result, Err(RegistryError::NotOwner(_, _))));
        assert_eq!(registry.stream_count().await, 1);
    }

    #[tokio::test]
    async fn test_removed_entry_marked_inactive() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(1);

        let (entry, _) = registry
            .create(conn, client_addr(), StreamRequest::default())
            .await
            .unwrap();
        let (removed, snapshot) = registry.remove(entry.id, conn).await.unwrap();

        assert!(!removed.active);
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_remove_all_for_targets_one_connection() {
        let registry = StreamRegistry::new();
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(2);

        for _ in 0..3 {
            registry
                .create(a, client_addr(), StreamRequest::default())
                .await
                .unwrap();
        }
        let (kept, _) = registry
            .create(b, client_addr(), StreamRequest::default())
            .await
            .unwrap();

        let (removed, snapshot) = registry.remove_all_for(a).await;

        assert_eq!(removed.len(), 3);
        assert!(removed.iter().all(|entry| entry.owner == a));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, kept.id);
        assert_eq!(registry.stream_count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_all_for_no_streams() {
        let registry = StreamRegistry::new();

        let (removed, snapshot) = registry.remove_all_for(ConnectionId::new(7)).await;
        assert!(removed.is_empty());
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(1);

        let mut ids = Vec::new();
        for _ in 0..5 {
            let (entry, _) = registry
                .create(conn, client_addr(), StreamRequest::default())
                .await
                .unwrap();
            ids.push(entry.id);
        }

        let listed: Vec<StreamId> = registry.list().await.iter().map(|e| e.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_update_limits_affects_later_creates() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(1);

        let applied = registry
            .update_limits(LimitUpdate {
                default_stream_port: Some(9000),
                max_bitrate: Some(192),
            })
            .await;
        assert_eq!(applied.default_stream_port, Some(9000));
        assert_eq!(applied.max_bitrate, Some(192));

        let (entry, _) = registry
            .create(
                conn,
                client_addr(),
                StreamRequest {
                    bitrate: Some(320),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(entry.port, 9000);
        assert_eq!(entry.bitrate_kbps, 192);
    }

    #[tokio::test]
    async fn test_owner_of() {
        let registry = StreamRegistry::new();
        let conn = ConnectionId::new(3);

        let (entry, _) = registry
            .create(conn, client_addr(), StreamRequest::default())
            .await
            .unwrap();

        assert_eq!(registry.owner_of(entry.id).await, Some(conn));
        assert_eq!(registry.owner_of(StreamId::generate()).await, None);
    }
}
