use crate::{
    AppState, chat_completions, get_status, health, list_available_models, list_models,
    load_model, start_engine, stop_engine,
};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

/// Build the application router with all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Engine management
        .route("/status", get(get_status))
        .route("/load", post(load_model))
        .route("/start", post(start_engine))
        .route("/stop", post(stop_engine))
        .route("/models/available", get(list_available_models))
        // OpenAI-compatible proxy
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/live", get(health::liveness_check))
        .route("/ready", get(health::readiness_check))
        // Add shared state
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
