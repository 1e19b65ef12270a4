//! Network discovery announcements
//!
//! Stream lifecycle events are advertised to the local network so other hosts
//! can find active streams. Discovery is strictly best-effort: the registry
//! calls into the [`DiscoveryAnnouncer`] capability after each mutation, and
//! no announcer failure may ever propagate back into registry state.

pub mod udp;

pub use udp::UdpAnnouncer;

use crate::registry::{StreamEntry, StreamId};

/// Capability for announcing stream lifecycle events to the network
///
/// Implementations must be non-blocking: the registry invokes these right
/// after releasing its write lock and does not await or inspect any outcome.
pub trait DiscoveryAnnouncer: Send + Sync {
    /// A stream was inserted into the registry
    fn stream_started(&self, entry: &StreamEntry);

    /// A stream was removed from the registry
    fn stream_removed(&self, id: &StreamId);
}

/// Announcer that discards all events
///
/// The default when discovery is disabled, and the failure-tolerant fallback
/// used in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnnouncer;

impl DiscoveryAnnouncer for NoopAnnouncer {
    fn stream_started(&self, _entry: &StreamEntry) {}

    fn stream_removed(&self, _id: &StreamId) {}
}
