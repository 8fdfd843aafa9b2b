//! Loopback forwarding of inference requests to the engine.

use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::pin::Pin;

use bytes::Bytes;
use error_location::ErrorLocation;
use futures::{Stream, StreamExt};
use http::{Method, StatusCode};
use mai_config::{EngineConfig, ProxyConfig};
use serde_json::Value;
use tracing::debug;

/// Finite, non-restartable sequence of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = SupervisorResult<Bytes>> + Send>>;

#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path on the engine, e.g. `/v1/chat/completions`
    pub path: String,
    pub body: Option<Value>,
    pub streaming: bool,
}

impl ProxyRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            streaming: false,
        }
    }

    pub fn post(path: impl Into<String>, body: Value, streaming: bool) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
            streaming,
        }
    }
}

pub enum ProxyResponse {
    Buffered {
        status: StatusCode,
        content_type: Option<String>,
        body: Bytes,
    },
    Streaming {
        status: StatusCode,
        content_type: Option<String>,
        stream: ByteStream,
    },
}

impl std::fmt::Debug for ProxyResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered { status, body, .. } => f
                .debug_struct("Buffered")
                .field("status", status)
                .field("len", &body.len())
                .finish(),
            Self::Streaming { status, .. } => {
                f.debug_struct("Streaming").field("status", status).finish()
            }
        }
    }
}

impl ProxyResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Buffered { status, .. } | Self::Streaming { status, .. } => *status,
        }
    }
}

/// HTTP client bound to the engine's base URL.
#[derive(Debug, Clone)]
pub struct EngineProxy {
    client: reqwest::Client,
    base_url: String,
    request_timeout_secs: u64,
}

impl EngineProxy {
    pub fn new(engine: &EngineConfig, proxy: &ProxyConfig) -> SupervisorResult<Self> {
        // read_timeout bounds the gap between stream chunks; buffered calls
        // additionally get a total timeout per request.
        let client = reqwest::Client::builder()
            .connect_timeout(proxy.connect_timeout())
            .read_timeout(proxy.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: engine.base_url(),
            request_timeout_secs: proxy.request_timeout_secs,
        })
    }

    pub async fn forward(&self, request: ProxyRequest) -> SupervisorResult<ProxyResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(
            "Proxying {} {} (streaming: {})",
            request.method, url, request.streaming
        );

        let mut builder = self.client.request(request.method, &url);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if !request.streaming {
            builder = builder.timeout(std::time::Duration::from_secs(self.request_timeout_secs));
        }

        let timeout_secs = self.request_timeout_secs;
        let response = builder
            .send()
            .await
            .map_err(|e| map_request_error(e, timeout_secs))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if request.streaming {
            let stream = response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| map_stream_error(e, timeout_secs)));

            Ok(ProxyResponse::Streaming {
                status,
                content_type,
                stream: Box::pin(stream),
            })
        } else {
            let body = response
                .bytes()
                .await
                .map_err(|e| map_request_error(e, timeout_secs))?;

            Ok(ProxyResponse::Buffered {
                status,
                content_type,
                body,
            })
        }
    }
}

#[track_caller]
fn map_request_error(e: reqwest::Error, timeout_secs: u64) -> SupervisorError {
    if e.is_timeout() {
        SupervisorError::UpstreamTimeout {
            timeout_secs,
            location: ErrorLocation::from(Location::caller()),
        }
    } else if e.is_connect() {
        SupervisorError::EngineUnavailable {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    } else {
        SupervisorError::from(e)
    }
}

#[track_caller]
fn map_stream_error(e: reqwest::Error, timeout_secs: u64) -> SupervisorError {
    if e.is_timeout() {
        SupervisorError::UpstreamTimeout {
            timeout_secs,
            location: ErrorLocation::from(Location::caller()),
        }
    } else {
        SupervisorError::StreamInterrupted {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
