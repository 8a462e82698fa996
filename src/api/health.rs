//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub bus: BusHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct BusHealthResponse {
    pub connected: bool,
    pub state: String,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let bus = match &state.bus {
        Some(client) => {
            let connection = client.connection_state();
            BusHealthResponse {
                connected: matches!(connection, async_nats::connection::State::Connected),
                state: format!("{:?}", connection).to_lowercase(),
            }
        }
        None => BusHealthResponse {
            connected: false,
            state: "not_connected".to_string(),
        },
    };

    let status = if bus.connected { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        bus,
    })
}
