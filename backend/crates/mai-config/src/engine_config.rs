use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_ENGINE_HOST, DEFAULT_ENGINE_LOG_LEVEL,
    DEFAULT_ENGINE_PORT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_MODEL_DIRECTORY,
    DEFAULT_PYTHON, MIN_PORT,
};

use serde::Deserialize;

pub const MIN_MAX_TOKENS: u32 = 1;
pub const MAX_MAX_TOKENS: u32 = 1_048_576;

const LOOPBACK_HOSTS: [&str; 3] = ["127.0.0.1", "localhost", "::1"];

/// Settings for the inference child process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model loaded when start() is called without one
    pub default_model: String,
    /// Directory scanned for locally available models
    pub model_directory: String,
    /// Child bind host (loopback only, the supervisor proxies it)
    pub host: String,
    /// Child bind port
    pub port: u16,
    /// Maximum token/context limit passed to the child
    pub max_tokens: u32,
    /// Interpreter used to run `-m mlx_lm.server`
    pub python: String,
    /// Log level passed through to the child
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_model: String::from(DEFAULT_MODEL),
            model_directory: String::from(DEFAULT_MODEL_DIRECTORY),
            host: String::from(DEFAULT_ENGINE_HOST),
            port: DEFAULT_ENGINE_PORT,
            max_tokens: DEFAULT_MAX_TOKENS,
            python: String::from(DEFAULT_PYTHON),
            log_level: String::from(DEFAULT_ENGINE_LOG_LEVEL),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::engine("engine.default_model cannot be empty"));
        }

        if self.port < MIN_PORT {
            return Err(ConfigError::engine(format!(
                "engine.port must be >= {}, got {}",
                MIN_PORT, self.port
            )));
        }

        if !LOOPBACK_HOSTS.contains(&self.host.as_str()) {
            return Err(ConfigError::engine(format!(
                "engine.host must be a loopback address ({}), got {}",
                LOOPBACK_HOSTS.join(", "),
                self.host
            )));
        }

        if self.max_tokens < MIN_MAX_TOKENS || self.max_tokens > MAX_MAX_TOKENS {
            return Err(ConfigError::engine(format!(
                "engine.max_tokens must be {}-{}, got {}",
                MIN_MAX_TOKENS, MAX_MAX_TOKENS, self.max_tokens
            )));
        }

        if self.python.trim().is_empty() {
            return Err(ConfigError::engine("engine.python cannot be empty"));
        }

        Ok(())
    }

    /// Base URL of the child's HTTP API.
    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}
