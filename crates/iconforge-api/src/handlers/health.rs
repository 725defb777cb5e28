//! Health check endpoints

use axum::{extract::State, Json};

use crate::{
    models::{HealthResponse, PingResponse},
    state::AppState,
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.uptime_seconds(),
    })
}

/// Liveness probe under the API prefix
#[utoipa::path(
    get,
    path = "/api/v1/ping",
    tag = "health",
    responses(
        (status = 200, description = "Pong", body = PingResponse)
    )
)]
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_string(),
    })
}
