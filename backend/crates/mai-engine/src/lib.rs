//! Supervisor for a local inference server process.

mod engine_state;
mod error;
mod health;
mod launcher;
mod lifecycle;
mod monitor;
mod process_handle;
mod proxy;
mod restart_state;
mod server_status;

#[cfg(test)]
mod tests;

pub use engine_state::EngineState;
pub use error::{Result as SupervisorResult, SupervisorError};
pub use health::{HealthProber, HealthStatus};
pub use launcher::{EngineLauncher, MlxLauncher};
pub use lifecycle::EngineSupervisor;
pub use process_handle::{Liveness, ProcessHandle};
pub use proxy::{ByteStream, EngineProxy, ProxyRequest, ProxyResponse};
pub use restart_state::RestartState;
pub use server_status::ServerStatus;
