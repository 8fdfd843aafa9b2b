//! Readiness probing of the engine's model-listing endpoint.

use crate::SupervisorResult;

use std::time::Instant;

use mai_config::{EngineConfig, ProxyConfig};
use serde::Serialize;

const HEALTH_PATH: &str = "/v1/models";

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy { latency_ms: u64 },
    Unhealthy { last_error: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Issues one bounded GET per call. Retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: reqwest::Client,
    url: String,
}

impl HealthProber {
    pub fn new(engine: &EngineConfig, proxy: &ProxyConfig) -> SupervisorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(proxy.health_timeout())
            .connect_timeout(proxy.health_timeout().min(proxy.connect_timeout()))
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}{}", engine.base_url(), HEALTH_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True only on a 2xx answer.
    pub async fn is_healthy(&self) -> bool {
        self.check().await.is_healthy()
    }

    pub async fn check(&self) -> HealthStatus {
        let start = Instant::now();

        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => HealthStatus::Healthy {
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Ok(resp) => HealthStatus::Unhealthy {
                last_error: format!("HTTP {}", resp.status()),
            },
            Err(e) => HealthStatus::Unhealthy {
                last_error: e.to_string(),
            },
        }
    }
}
