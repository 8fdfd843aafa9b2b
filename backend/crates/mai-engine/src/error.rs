use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to launch engine process `{program}`: {source} {location}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Engine for model {model} did not become healthy after {attempts} checks {location}")]
    StartupTimeout {
        model: String,
        attempts: u32,
        location: ErrorLocation,
    },

    #[error("Engine for model {model} crashed {attempts} times, giving up {location}")]
    RecoveryExhausted {
        model: String,
        attempts: u32,
        location: ErrorLocation,
    },

    #[error("Engine unavailable: {message} {location}")]
    EngineUnavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Engine did not respond within {timeout_secs}s {location}")]
    UpstreamTimeout {
        timeout_secs: u64,
        location: ErrorLocation,
    },

    #[error("Engine stream interrupted: {message} {location}")]
    StreamInterrupted {
        message: String,
        location: ErrorLocation,
    },

    #[error("Supervisor is shutting down {location}")]
    ShuttingDown { location: ErrorLocation },

    #[error("HTTP error: {source} {location}")]
    Http {
        #[source]
        source: reqwest::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    #[track_caller]
    pub fn engine_unavailable<S: Into<String>>(message: S) -> Self {
        Self::EngineUnavailable {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn shutting_down() -> Self {
        Self::ShuttingDown {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Whether the caller may retry the same request after a delay
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EngineUnavailable { .. } | Self::UpstreamTimeout { .. }
        )
    }

    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::LaunchFailed { .. } => {
                "The inference server could not be launched. \
                   Check that the configured python interpreter has mlx_lm installed."
            }
            Self::StartupTimeout { .. } => {
                "The model is taking too long to load. \
                   The process was left running; check its log output or stop it."
            }
            Self::RecoveryExhausted { .. } => {
                "The engine keeps crashing. \
                   Check memory headroom and the model, then start it manually."
            }
            Self::EngineUnavailable { .. } => {
                "No healthy engine is running right now. Retry after a short delay."
            }
            Self::UpstreamTimeout { .. } => {
                "The engine took too long to answer. Retry with a shorter generation."
            }
            Self::StreamInterrupted { .. } => {
                "The engine closed the stream early. The output received so far is incomplete."
            }
            _ => "An unexpected error occurred. Please check the logs for details.",
        }
    }
}

impl From<reqwest::Error> for SupervisorError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        Self::Http {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
