pub mod api;
pub mod app_state;
pub mod error;
pub mod health;
pub mod logger;
pub mod routes;

#[cfg(test)]
mod tests;

pub use api::{
    engine::{
        action_response::{ActionResponse, LoadModelResponse},
        available_models_response::{AvailableModel, AvailableModelsResponse},
        engine::{get_status, list_available_models, load_model, start_engine, stop_engine},
        load_model_request::LoadModelRequest,
        start_query::StartQuery,
    },
    error::ApiError,
    error::Result as ApiResult,
    openai::{
        chat_completion_request::{ChatCompletionRequest, ChatMessage, ChatRole},
        openai::{chat_completions, list_models},
    },
};
pub use app_state::AppState;

pub use crate::routes::build_router;
