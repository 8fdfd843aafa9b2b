#![allow(dead_code)]

//! Test infrastructure for mai-server API tests

use mai_config::{Config, EngineConfig, ProxyConfig, ResilienceConfig, ServerConfig};
use mai_engine::{EngineLauncher, EngineSupervisor};
use mai_server::{AppState, build_router};

use std::process::Command;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stands in for the inference server process: lives until signalled.
#[derive(Debug)]
pub struct SleepLauncher;

impl EngineLauncher for SleepLauncher {
    fn command(&self, _engine: &EngineConfig, _model: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exec sleep 30");
        cmd
    }
}

pub fn test_config(engine_port: u16, model_directory: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        engine: EngineConfig {
            default_model: "default-model".to_string(),
            model_directory: model_directory.to_string(),
            host: "127.0.0.1".to_string(),
            port: engine_port,
            ..EngineConfig::default()
        },
        resilience: ResilienceConfig {
            startup_attempts: 3,
            startup_poll_interval_ms: 20,
            health_check_interval_ms: 50,
            max_restart_attempts: 1,
            backoff_base: 2,
            backoff_unit_ms: 10,
            shutdown_grace_ms: 500,
            kill_reap_ms: 500,
            swap_cooldown_ms: 10,
        },
        proxy: ProxyConfig {
            request_timeout_secs: 5,
            connect_timeout_ms: 200,
            health_timeout_ms: 200,
        },
        ..Config::default()
    }
}

/// Fake engine whose health endpoint answers 200.
pub async fn create_fake_engine() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "default-model", "object": "model"}]
        })))
        .mount(&server)
        .await;
    server
}

/// Create AppState for testing against `engine`
pub fn create_test_app_state(engine: &MockServer) -> AppState {
    create_test_app_state_with_models(engine, "does-not-exist")
}

pub fn create_test_app_state_with_models(engine: &MockServer, model_directory: &str) -> AppState {
    let config = test_config(engine.address().port(), model_directory);
    let supervisor = EngineSupervisor::with_launcher(config, Arc::new(SleepLauncher)).unwrap();
    AppState::new(supervisor)
}

pub async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Router over a state whose engine is already running.
pub async fn running_app(engine: &MockServer) -> (AppState, Router) {
    let state = create_test_app_state(engine);
    state.supervisor.start(None).await.unwrap();
    let app = build_router(state.clone());
    (state, app)
}
