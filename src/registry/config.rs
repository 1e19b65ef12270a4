//! Registry configuration
//!
//! The allocator base port and the bitrate clamp bounds. Held inside the
//! registry's critical section so the clamp and the allocator always observe
//! one consistent configuration, including across runtime updates.

use serde::{Deserialize, Serialize};

/// Bitrate applied when a start request carries none
pub const DEFAULT_BITRATE_KBPS: u32 = 128;

/// Registry configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Base port the allocator probes from
    pub default_stream_port: u16,

    /// Lower bitrate clamp bound in kbps
    pub min_bitrate: u32,

    /// Upper bitrate clamp bound in kbps
    pub max_bitrate: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_stream_port: 420,
            min_bitrate: 64,
            max_bitrate: 320,
        }
    }
}

impl RegistryConfig {
    /// Set the allocator base port
    pub fn default_stream_port(mut self, port: u16) -> Self {
        self.default_stream_port = port;
        self
    }

    /// Set the bitrate clamp bounds; inverted bounds are reordered
    pub fn bitrate_bounds(mut self, min: u32, max: u32) -> Self {
        self.min_bitrate = min.min(max);
        self.max_bitrate = min.max(max);
        self
    }

    /// Clamp a requested bitrate into the configured bounds
    pub fn clamp_bitrate(&self, requested: u32) -> u32 {
        requested.clamp(self.min_bitrate, self.max_bitrate)
    }

    /// Apply a runtime update, returning the subset that passed validation
    ///
    /// Out-of-range values are skipped rather than rejected wholesale, so a
    /// partially valid request still applies its valid fields.
    pub(super) fn apply(&mut self, update: &LimitUpdate) -> LimitUpdate {
        let mut applied = LimitUpdate::default();

        if let Some(port) = update.default_stream_port {
            if port >= 1024 {
                self.default_stream_port = port;
                applied.default_stream_port = Some(port);
            }
        }

        if let Some(bitrate) = update.max_bitrate {
            // A maximum below the current minimum would invert the clamp.
            if (64..=320).contains(&bitrate) && bitrate >= self.min_bitrate {
                self.max_bitrate = bitrate;
                applied.max_bitrate = Some(bitrate);
            }
        }

        applied
    }
}

/// Runtime-adjustable subset of the registry configuration
///
/// Doubles as the `update-config` request payload and the `config-updated`
/// acknowledgment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitUpdate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default_stream_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_bitrate: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.default_stream_port, 420);
        assert_eq!(config.min_bitrate, 64);
        assert_eq!(config.max_bitrate, 320);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .default_stream_port(5000)
            .bitrate_bounds(96, 256);

        assert_eq!(config.default_stream_port, 5000);
        assert_eq!(config.min_bitrate, 96);
        assert_eq!(config.max_bitrate, 256);
    }

    #[test]
    fn test_clamp_bitrate() {
        let config = RegistryConfig::default();

        assert_eq!(config.clamp_bitrate(1000), 320);
        assert_eq!(config.clamp_bitrate(10), 64);
        assert_eq!(config.clamp_bitrate(128), 128);
    }

    #[test]
    fn test_inverted_bitrate_bounds_reordered() {
        let config = RegistryConfig::default().bitrate_bounds(400, 320);

        assert_eq!(config.min_bitrate, 320);
        assert_eq!(config.max_bitrate, 400);
        assert_eq!(config.clamp_bitrate(128), 320);
    }

    #[test]
    fn test_apply_skips_max_below_min() {
        let mut config = RegistryConfig::default().bitrate_bounds(300, 320);
        let applied = config.apply(&LimitUpdate {
            default_stream_port: None,
            max_bitrate: Some(128),
        });

        assert_eq!(config.max_bitrate, 320);
        assert_eq!(applied.max_bitrate, None);
        assert_eq!(config.clamp_bitrate(128), 300);
    }

    #[test]
    fn test_apply_valid_update() {
        let mut config = RegistryConfig::default();
        let applied = config.apply(&LimitUpdate {
            default_stream_port: Some(5000),
            max_bitrate: Some(256),
        });

        assert_eq!(config.default_stream_port, 5000);
        assert_eq!(config.max_bitrate, 256);
        assert_eq!(applied.default_stream_port, Some(5000));
        assert_eq!(applied.max_bitrate, Some(256));
    }

    #[test]
    fn test_apply_skips_out_of_range() {
        let mut config = RegistryConfig::default();
        let applied = config.apply(&LimitUpdate {
            default_stream_port: Some(80), // below 1024
            max_bitrate: Some(9999),       // above 320
        });

        assert_eq!(config, RegistryConfig::default());
        assert_eq!(applied, LimitUpdate::default());
    }

    #[test]
    fn test_apply_partially_valid() {
        let mut config = RegistryConfig::default();
        let applied = config.apply(&LimitUpdate {
            default_stream_port: Some(80),
            max_bitrate: Some(192),
        });

        assert_eq!(config.default_stream_port, 420);
        assert_eq!(config.max_bitrate, 192);
        assert_eq!(applied.default_stream_port, None);
        assert_eq!(applied.max_bitrate, Some(192));
    }

    #[test]
    fn test_limit_update_omits_absent_fields() {
        let update = LimitUpdate {
            default_stream_port: None,
            max_bitrate: Some(192),
        };

        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("defaultStreamPort").is_none());
        assert_eq!(json["maxBitrate"], 192);
    }
}
