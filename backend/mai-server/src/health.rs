use crate::AppState;

use mai_engine::EngineState;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// GET /health - Supervisor health with the engine status embedded
pub async fn health_check(State(state): State<AppState>) -> Response {
    let engine = state.supervisor.status();
    let status = if engine.state == EngineState::Running {
        "healthy"
    } else {
        "degraded"
    };

    let health = json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "engine": engine,
    });

    (StatusCode::OK, Json(health)).into_response()
}

/// GET /live - Liveness probe (is the process alive?)
pub async fn liveness_check() -> Response {
    (StatusCode::OK, "OK").into_response()
}

/// GET /ready - Readiness probe (can inference requests be served?)
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    if state.supervisor.status().state == EngineState::Running {
        (StatusCode::OK, "Ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Engine not ready").into_response()
    }
}
