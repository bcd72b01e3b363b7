//! Health check handlers.

use axum::Json;
use axum::extract::State;

use filestore_realtime::HubState;

use crate::dto::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// GET /api/health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    let hub = state.hub.state();
    let status = match hub {
        HubState::Running => "ok",
        HubState::Created | HubState::Stopped => "degraded",
    };

    Json(ApiResponse::ok(DetailedHealthResponse {
        status: status.to_string(),
        hub,
        ws_connections: state.hub.connection_count(),
        metrics: state.hub.metrics(),
    }))
}
