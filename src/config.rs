//! Server configuration

use serde::{Deserialize, Serialize};

use crate::registry::RegistryConfig;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the web interface and API listen on
    pub web_port: u16,

    /// Base port for stream allocation
    pub default_stream_port: u16,

    /// Lower bitrate clamp bound in kbps
    pub min_bitrate: u32,

    /// Upper bitrate clamp bound in kbps
    pub max_bitrate: u32,

    /// Sample rate advertised to clients; advisory, not enforced
    pub sample_rate: u32,

    /// Channel count advertised to clients; advisory, not enforced
    pub channels: u8,

    /// Name broadcast in discovery presence beacons
    pub service_name: String,

    /// Whether UDP discovery announcements are sent
    pub discovery_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            web_port: 6969,
            default_stream_port: 420,
            min_bitrate: 64,
            max_bitrate: 320,
            sample_rate: 44100,
            channels: 2,
            service_name: default_service_name(),
            discovery_enabled: true,
        }
    }
}

fn default_service_name() -> String {
    match std::env::var("HOSTNAME") {
        Ok(host) if !host.is_empty() => format!("homecast-audio-{}", host),
        _ => "homecast-audio".to_string(),
    }
}

impl ServerConfig {
    /// Set the web listen port
    pub fn web_port(mut self, port: u16) -> Self {
        self.web_port = port;
        self
    }

    /// Set the stream allocator base port
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

    /// Set the discovery service name
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Disable UDP discovery announcements
    pub fn disable_discovery(mut self) -> Self {
        self.discovery_enabled = false;
        self
    }

    /// Build a configuration from `HOMECAST_*` environment variables
    ///
    /// Unset variables keep their defaults; unparsable values are logged and
    /// skipped.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env_parse("HOMECAST_WEB_PORT") {
            config.web_port = port;
        }
        if let Some(port) = env_parse("HOMECAST_STREAM_PORT") {
            config.default_stream_port = port;
        }
        if let Some(bitrate) = env_parse("HOMECAST_MIN_BITRATE") {
            config.min_bitrate = bitrate;
        }
        if let Some(bitrate) = env_parse("HOMECAST_MAX_BITRATE") {
            config.max_bitrate = bitrate;
        }
        if let Ok(name) = std::env::var("HOMECAST_SERVICE_NAME") {
            if !name.is_empty() {
                config.service_name = name;
            }
        }
        if let Ok(value) = std::env::var("HOMECAST_DISCOVERY") {
            config.discovery_enabled = !matches!(value.as_str(), "0" | "false" | "off");
        }

        if config.min_bitrate > config.max_bitrate {
            tracing::warn!(
                min = config.min_bitrate,
                max = config.max_bitrate,
                "Reordering inverted bitrate bounds"
            );
            std::mem::swap(&mut config.min_bitrate, &mut config.max_bitrate);
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key = key, value = %value, "Ignoring unparsable environment variable");
            None
        }
    }
}

impl From<&ServerConfig> for RegistryConfig {
    fn from(config: &ServerConfig) -> Self {
        RegistryConfig::default()
            .default_stream_port(config.default_stream_port)
            .bitrate_bounds(config.min_bitrate, config.max_bitrate)
    }
}

/// Client-visible configuration, served by `/api/config` and pushed in the
/// `config` greeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub web_port: u16,
    pub default_stream_port: u16,
    pub max_bitrate: u32,
    pub min_bitrate: u32,
    pub sample_rate: u32,
    pub channels: u8,
}
