//! Live audio level relay
//!
//! Stateless pass-through for loudness samples, with a last-value cache per
//! stream so polling clients and newly joining observers can read the current
//! meter positions. No history, no persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::registry::StreamId;

/// An instantaneous loudness measurement for one stream
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LevelSample {
    /// Linear level, clamped to 0.0..=1.0
    pub level: f32,

    /// Decibel value; negative infinity when the level is 0
    ///
    /// JSON has no infinity literal, so the wire carries `null` for silence,
    /// matching what the browser meter sends.
    pub db: f32,

    /// When the sample was received
    pub timestamp: DateTime<Utc>,
}

/// Last-value cache of level samples, keyed by stream ID
pub struct LevelRelay {
    levels: RwLock<HashMap<StreamId, LevelSample>>,
}

impl LevelRelay {
    pub fn new() -> Self {
        Self {
            levels: RwLock::new(HashMap::new()),
        }
    }

    /// Record a sample and return the normalized value to broadcast
    pub async fn publish(&self, id: StreamId, level: f32, db: f32) -> LevelSample {
        let level = level.clamp(0.0, 1.0);
        let db = if level == 0.0 { f32::NEG_INFINITY } else { db };
        let sample = LevelSample {
            level,
            db,
            timestamp: Utc::now(),
        };

        self.levels.write().await.insert(id, sample);
        sample
    }

    /// Snapshot of the latest sample per stream
    pub async fn current_levels(&self) -> HashMap<StreamId, LevelSample> {
        self.levels.read().await.clone()
    }

    /// Drop the cached sample for a removed stream
    pub async fn forget(&self, id: &StreamId) {
        self.levels.write().await.remove(id);
    }
}

impl Default for LevelRelay {
    fn default() -> Self {
        Self::new()
    }
}
