//! REST API error types
//!
//! Every failure is rendered as `{"error": {"code", "message"}}` with a
//! status code that tells clients whether retrying makes sense.

use mai_engine::SupervisorError;

use std::panic::Location;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use error_location::ErrorLocation;
use serde::Serialize;
use thiserror::Error;

/// Seconds clients are asked to wait before retrying a 503
pub const RETRY_AFTER_SECS: u64 = 5;

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// Inner error body with code, message, and optional field
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "ENGINE_UNAVAILABLE")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Field name if this is a validation error for a specific field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// API errors with associated HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation error (400)
    #[error("Validation failed: {message} {location}")]
    Validation {
        message: String,
        field: Option<String>,
        location: ErrorLocation,
    },

    /// No healthy engine to serve the request (503, retryable)
    #[error("Engine unavailable: {message} {location}")]
    EngineUnavailable {
        message: String,
        location: ErrorLocation,
    },

    /// Engine accepted the request but did not answer in time (504)
    #[error("Upstream timeout: {message} {location}")]
    UpstreamTimeout {
        message: String,
        location: ErrorLocation,
    },

    /// Engine answered with something unusable (502)
    #[error("Bad gateway: {message} {location}")]
    BadGateway {
        message: String,
        location: ErrorLocation,
    },

    /// Internal server error (500)
    #[error("Internal error: {message} {location}")]
    Internal {
        message: String,
        location: ErrorLocation,
    },
}

impl ApiError {
    #[track_caller]
    pub fn validation<S: Into<String>>(message: S, field: &str) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.to_string()),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log the error with location for debugging
        match self {
            ApiError::Validation { .. } => log::warn!("{}", self),
            _ => log::error!("{}", self),
        }

        let (status, body) = match self {
            ApiError::Validation { message, field, .. } => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "VALIDATION_ERROR".into(),
                    message,
                    field,
                },
            ),
            ApiError::EngineUnavailable { message, .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody {
                    code: "ENGINE_UNAVAILABLE".into(),
                    message,
                    field: None,
                },
            ),
            ApiError::UpstreamTimeout { message, .. } => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiErrorBody {
                    code: "UPSTREAM_TIMEOUT".into(),
                    message,
                    field: None,
                },
            ),
            ApiError::BadGateway { message, .. } => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "BAD_GATEWAY".into(),
                    message,
                    field: None,
                },
            ),
            ApiError::Internal { message, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".into(),
                    message,
                    field: None,
                },
            ),
        };

        let mut response = (status, Json(ApiErrorResponse { error: body })).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

/// Convert supervisor errors to API errors
impl From<SupervisorError> for ApiError {
    #[track_caller]
    fn from(e: SupervisorError) -> Self {
        let location = ErrorLocation::from(Location::caller());

        match e {
            SupervisorError::EngineUnavailable { message, .. } => {
                ApiError::EngineUnavailable { message, location }
            }
            SupervisorError::ShuttingDown { .. } => ApiError::EngineUnavailable {
                message: "Server is shutting down".to_string(),
                location,
            },
            SupervisorError::UpstreamTimeout { timeout_secs, .. } => ApiError::UpstreamTimeout {
                message: format!("Engine did not respond within {timeout_secs}s"),
                location,
            },
            SupervisorError::StreamInterrupted { message, .. } => ApiError::BadGateway {
                message: format!("Engine stream interrupted: {message}"),
                location,
            },
            SupervisorError::Http { ref source, .. } => ApiError::BadGateway {
                message: format!("Engine request failed: {source}"),
                location,
            },
            SupervisorError::StartupTimeout {
                ref model,
                attempts,
                ..
            } => ApiError::Internal {
                message: format!(
                    "Model {model} did not become healthy after {attempts} checks. {}",
                    e.recovery_hint()
                ),
                location,
            },
            SupervisorError::RecoveryExhausted {
                ref model,
                attempts,
                ..
            } => ApiError::Internal {
                message: format!(
                    "Engine for {model} failed {attempts} restart attempts. {}",
                    e.recovery_hint()
                ),
                location,
            },
            SupervisorError::LaunchFailed { ref program, .. } => ApiError::Internal {
                message: format!("Failed to launch {program}. {}", e.recovery_hint()),
                location,
            },
        }
    }
}

/// Malformed or mistyped JSON bodies are client errors
impl From<JsonRejection> for ApiError {
    #[track_caller]
    fn from(e: JsonRejection) -> Self {
        ApiError::Validation {
            message: e.body_text(),
            field: None,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    #[track_caller]
    fn from(e: QueryRejection) -> Self {
        ApiError::Validation {
            message: e.body_text(),
            field: None,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
