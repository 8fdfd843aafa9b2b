use crate::ApiError;

use mai_engine::SupervisorError;

use std::panic::Location;

use axum::response::IntoResponse;
use error_location::ErrorLocation;
use http::StatusCode;
use http_body_util::BodyExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_validation_error_returns_400_with_field() {
    let error = ApiError::validation("max_tokens must be 1-32768, got 0", "max_tokens");
    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "max_tokens");
}

#[tokio::test]
async fn test_engine_unavailable_returns_503_with_retry_after() {
    let error = ApiError::EngineUnavailable {
        message: "no healthy engine process is running".into(),
        location: ErrorLocation::from(Location::caller()),
    };
    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()[http::header::RETRY_AFTER], "5");

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "ENGINE_UNAVAILABLE");
    assert!(json["error"].get("field").is_none());
}

#[tokio::test]
async fn test_upstream_timeout_returns_504() {
    let error = ApiError::UpstreamTimeout {
        message: "Engine did not respond within 120s".into(),
        location: ErrorLocation::from(Location::caller()),
    };
    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(response.headers().get(http::header::RETRY_AFTER).is_none());

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "UPSTREAM_TIMEOUT");
}

#[tokio::test]
async fn test_bad_gateway_returns_502() {
    let error = ApiError::BadGateway {
        message: "Engine stream interrupted".into(),
        location: ErrorLocation::from(Location::caller()),
    };
    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_internal_error_returns_500() {
    let error = ApiError::Internal {
        message: "Failed to launch python3".into(),
        location: ErrorLocation::from(Location::caller()),
    };
    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"]["message"], "Failed to launch python3");
}

#[test]
fn test_supervisor_unavailable_maps_to_engine_unavailable() {
    let error: ApiError = SupervisorError::engine_unavailable("down").into();

    assert!(matches!(error, ApiError::EngineUnavailable { ref message, .. } if message == "down"));
}

#[test]
fn test_supervisor_shutting_down_maps_to_engine_unavailable() {
    let error: ApiError = SupervisorError::shutting_down().into();

    assert!(matches!(error, ApiError::EngineUnavailable { .. }));
}

#[test]
fn test_supervisor_timeout_maps_to_upstream_timeout() {
    let error: ApiError = SupervisorError::UpstreamTimeout {
        timeout_secs: 30,
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    assert!(matches!(error, ApiError::UpstreamTimeout { ref message, .. } if message.contains("30s")));
}

#[test]
fn test_supervisor_stream_interrupted_maps_to_bad_gateway() {
    let error: ApiError = SupervisorError::StreamInterrupted {
        message: "connection reset".into(),
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    assert!(matches!(error, ApiError::BadGateway { .. }));
}

#[test]
fn test_supervisor_startup_timeout_maps_to_internal_with_hint() {
    let error: ApiError = SupervisorError::StartupTimeout {
        model: "model-a".into(),
        attempts: 30,
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    match error {
        ApiError::Internal { message, .. } => {
            assert!(message.contains("model-a"));
            assert!(message.contains("30 checks"));
        }
        other => panic!("expected internal error, got {other:?}"),
    }
}
