//! OpenAI-compatible endpoints, forwarded to the engine

use crate::{ApiError, ApiResult, AppState, ChatCompletionRequest};

use mai_engine::{ProxyRequest, ProxyResponse};

use std::panic::Location;

use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use error_location::ErrorLocation;
use futures::TryStreamExt;

const MODELS_PATH: &str = "/v1/models";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const JSON_CONTENT_TYPE: &str = "application/json";
const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// GET /v1/models
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Response> {
    let response = state.supervisor.proxy(ProxyRequest::get(MODELS_PATH)).await?;
    Ok(into_http_response(response))
}

/// POST /v1/chat/completions
///
/// With `stream: true` the engine's server-sent events are relayed chunk by
/// chunk as they arrive.
pub async fn chat_completions(
    State(state): State<AppState>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let request = request.validate(state.config.engine.max_tokens)?;
    let streaming = request.stream;

    let body = serde_json::to_value(&request).map_err(|e| ApiError::Internal {
        message: format!("Failed to encode request: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    log::debug!(
        "Chat completion: {} message(s), max_tokens={:?}, stream={streaming}",
        request.messages.len(),
        request.max_tokens
    );

    let response = state
        .supervisor
        .proxy(ProxyRequest::post(CHAT_COMPLETIONS_PATH, body, streaming))
        .await?;

    Ok(into_http_response(response))
}

fn into_http_response(response: ProxyResponse) -> Response {
    match response {
        ProxyResponse::Buffered {
            status,
            content_type,
            body,
        } => {
            let content_type = content_type.unwrap_or_else(|| JSON_CONTENT_TYPE.to_string());
            (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        ProxyResponse::Streaming {
            status,
            content_type,
            stream,
        } => {
            let content_type =
                content_type.unwrap_or_else(|| EVENT_STREAM_CONTENT_TYPE.to_string());
            let stream = stream.inspect_err(|e| log::warn!("Chat stream ended early: {e}"));

            (
                status,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "no-cache".to_string()),
                ],
                Body::from_stream(stream),
            )
                .into_response()
        }
    }
}
