//! Stream port allocation
//!
//! Ports are not reserved anywhere outside the registry's current port set:
//! registry membership *is* the reservation, and a port frees the instant its
//! entry is removed.

use std::collections::HashSet;

use super::error::RegistryError;

/// Lowest port the allocator wraps to after passing 65535
pub const MIN_DYNAMIC_PORT: u16 = 1024;

/// Hands out stream ports from a configured base
///
/// A preferred port is honored when free; zero counts as absent. Otherwise
/// the allocator probes
/// linearly upward from the base, wrapping from 65535 back to
/// [`MIN_DYNAMIC_PORT`]. The probe is bounded to one pass over the reachable
/// range, so a fully occupied port space yields an explicit error instead of
/// spinning.
#[derive(Debug, Clone, Copy)]
pub struct PortAllocator {
    base: u16,
}

impl PortAllocator {
    /// Create an allocator probing from `base`
    pub fn new(base: u16) -> Self {
        Self { base }
    }

    /// Allocate a port not present in `in_use`
    pub fn allocate(
        &self,
        in_use: &HashSet<u16>,
        preferred: Option<u16>,
    ) -> Result<u16, RegistryError> {
        // Port 0 is the dashboard's empty form value, not a preference.
        if let Some(port) = preferred.filter(|&port| port != 0) {
            if !in_use.contains(&port) {
                return Ok(port);
            }
        }

        // Wrapping below the base lands at MIN_DYNAMIC_PORT, so every
        // candidate is in [min(base, MIN_DYNAMIC_PORT), 65535] and one pass
        // over that span visits each at most once.
        let lowest = self.base.min(MIN_DYNAMIC_PORT);
        let span = u16::MAX as usize - lowest as usize + 1;

        let mut port = self.base;
        for _ in 0..span {
            if !in_use.contains(&port) {
                return Ok(port);
            }
            port = if port == u16::MAX {
                MIN_DYNAMIC_PORT
            } else {
                port + 1
            };
        }

        Err(RegistryError::PortSpaceExhausted)
    }
}
