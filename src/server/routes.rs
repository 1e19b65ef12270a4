//! Read-only HTTP API handlers
//!
//! Poll-friendly views over the same state the WebSocket channel pushes.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::PublicConfig;
use crate::levels::LevelSample;
use crate::registry::{StreamId, StreamSummary};

use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamsResponse {
    pub success: bool,
    pub streams: Vec<StreamSummary>,
    pub total_streams: usize,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub config: PublicConfig,
}

#[derive(Debug, Serialize)]
pub struct LevelsResponse {
    pub success: bool,
    pub levels: HashMap<StreamId, LevelSample>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_streams: usize,
    /// Seconds since the server started
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

/// `GET /api/streams`
pub async fn get_streams(State(state): State<AppState>) -> Json<StreamsResponse> {
    let streams = state.registry.summaries().await;
    let total_streams = streams.len();

    Json(StreamsResponse {
        success: true,
        streams,
        total_streams,
    })
}

/// `GET /api/config`
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        success: true,
        config: state.public_config().await,
    })
}

/// `GET /api/levels`, a polling fallback for clients without a WebSocket
pub async fn get_levels(State(state): State<AppState>) -> Json<LevelsResponse> {
    Json(LevelsResponse {
        success: true,
        levels: state.levels.current_levels().await,
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        active_streams: state.registry.stream_count().await,
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_response_serialization() {
        let response = StreamsResponse {
            success: true,
            streams: vec![],
            total_streams: 0,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["totalStreams"], 0);
        assert!(json["streams"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            active_streams: 2,
            uptime: 12.5,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["activeStreams"], 2);
        assert_eq!(json["uptime"], 12.5);
        assert!(json["timestamp"].is_string());
    }
}
