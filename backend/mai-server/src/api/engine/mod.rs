pub mod action_response;
pub mod available_models_response;
#[allow(clippy::module_inception)]
pub mod engine;
pub mod load_model_request;
pub mod start_query;
