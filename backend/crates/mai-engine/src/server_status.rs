use crate::EngineState;

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Last published view of the lifecycle, readable without the lifecycle lock.
#[derive(Debug, Clone)]
pub(crate) struct StatusSnapshot {
    pub state: EngineState,
    pub model: Option<String>,
    pub pid: Option<u32>,
    pub started_at: Option<Instant>,
    pub started_at_utc: Option<DateTime<Utc>>,
    pub restart_attempts: u32,
    pub monitoring: bool,
    pub last_exit_code: Option<i32>,
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    pub fn stopped() -> Self {
        Self {
            state: EngineState::Stopped,
            model: None,
            pid: None,
            started_at: None,
            started_at_utc: None,
            restart_attempts: 0,
            monitoring: false,
            last_exit_code: None,
            last_error: None,
        }
    }

    /// Proxying is only allowed against a health-confirmed process.
    pub fn is_serving(&self) -> bool {
        self.state == EngineState::Running && self.pid.is_some()
    }
}

/// Operator-facing status of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    /// `running` while an engine process exists, otherwise `stopped`
    pub status: String,
    /// Detailed lifecycle phase
    pub state: EngineState,
    pub running: bool,
    pub current_model: Option<String>,
    pub uptime_seconds: f64,
    pub restart_attempts: u32,
    /// Port the supervisor API listens on
    pub port: u16,
    /// Port of the engine process on loopback
    pub engine_port: u16,
    pub pid: Option<u32>,
    pub started_at: Option<String>,
    pub monitoring: bool,
    pub last_exit_code: Option<i32>,
    pub last_error: Option<String>,
}

impl ServerStatus {
    pub(crate) fn from_snapshot(snapshot: &StatusSnapshot, port: u16, engine_port: u16) -> Self {
        let running = snapshot.pid.is_some();
        let uptime_seconds = snapshot
            .started_at
            .filter(|_| running)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);

        Self {
            status: if running { "running" } else { "stopped" }.to_string(),
            state: snapshot.state.clone(),
            running,
            current_model: snapshot.model.clone(),
            uptime_seconds,
            restart_attempts: snapshot.restart_attempts,
            port,
            engine_port,
            pid: snapshot.pid,
            started_at: snapshot.started_at_utc.map(|t| t.to_rfc3339()),
            monitoring: snapshot.monitoring,
            last_exit_code: snapshot.last_exit_code,
            last_error: snapshot.last_error.clone(),
        }
    }
}
