mod config;
mod engine_config;
mod error;
mod log_level;
mod logging_config;
mod proxy_config;
mod resilience_config;
mod server_config;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use engine_config::EngineConfig;
pub use error::{ConfigError, ConfigErrorResult};
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use proxy_config::ProxyConfig;
pub use resilience_config::ResilienceConfig;
pub use server_config::ServerConfig;

// Server (external listener)
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8081;
const MIN_PORT: u16 = 1024;

// Engine (child process)
const DEFAULT_ENGINE_HOST: &str = "127.0.0.1";
const DEFAULT_ENGINE_PORT: u16 = 8082;
const DEFAULT_MODEL: &str = "mlx-community/Qwen2.5-7B-Instruct-4bit";
const DEFAULT_MODEL_DIRECTORY: &str = "models";
const DEFAULT_MAX_TOKENS: u32 = 32768;
const DEFAULT_PYTHON: &str = "python3";
const DEFAULT_ENGINE_LOG_LEVEL: &str = "INFO";

// Logging
const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "log";
const DEFAULT_LOG_COLORED: bool = true;

// Config directory
const CONFIG_DIR_ENV: &str = "MAI_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = ".mai";
const CONFIG_FILENAME: &str = "config.toml";
