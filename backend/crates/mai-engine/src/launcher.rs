//! Builds the command line for the inference child process.

use std::fmt::Debug;
use std::process::Command;

use mai_config::EngineConfig;

/// Produces the OS command that runs an inference server for `model`.
///
/// The supervisor adds stdio wiring and process-group isolation itself,
/// so implementations only describe the program and its arguments.
pub trait EngineLauncher: Debug + Send + Sync {
    fn command(&self, engine: &EngineConfig, model: &str) -> Command;
}

/// Launches `python -m mlx_lm.server`, bound to loopback.
#[derive(Debug, Default, Clone, Copy)]
pub struct MlxLauncher;

impl EngineLauncher for MlxLauncher {
    fn command(&self, engine: &EngineConfig, model: &str) -> Command {
        let mut cmd = Command::new(&engine.python);
        cmd.args(["-m", "mlx_lm.server"])
            .args(["--model", model])
            .args(["--host", &engine.host])
            .args(["--port", &engine.port.to_string()])
            .args(["--max-tokens", &engine.max_tokens.to_string()])
            .args(["--log-level", &engine.log_level]);
        cmd
    }
}
