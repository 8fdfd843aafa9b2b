use serde::Serialize;

/// Lifecycle phase of the engine process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum EngineState {
    /// No engine process
    Stopped,
    /// Process launched, waiting for the health endpoint
    Starting,
    /// Process alive and health-confirmed
    Running,
    /// Process alive but never became healthy
    Unhealthy,
    /// Waiting out a backoff before restart attempt `attempt`
    Restarting { attempt: u32 },
    /// Deliberate stop in progress
    ShuttingDown,
    /// Recovery gave up; a manual start is required
    Failed { error: String },
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Unhealthy => "unhealthy",
            Self::Restarting { .. } => "restarting",
            Self::ShuttingDown => "shutting_down",
            Self::Failed { .. } => "failed",
        }
    }
}
