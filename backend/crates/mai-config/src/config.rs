use crate::{
    CONFIG_DIR_ENV, CONFIG_FILENAME, ConfigError, ConfigErrorResult, DEFAULT_CONFIG_DIR,
    EngineConfig, LoggingConfig, ProxyConfig, ResilienceConfig, ServerConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

const ENV_FILENAME: &str = ".env.host";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub resilience: ResilienceConfig,
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config with full production error handling.
    ///
    /// Loading order:
    /// 1. Check for MAI_CONFIG_DIR env var, else use ./.mai/
    /// 2. Auto-create config directory if it doesn't exist
    /// 3. Load .env.host from the config directory if present
    /// 4. Load config.toml if it exists, else use defaults
    /// 5. Apply MAI_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let env_path = config_dir.join(ENV_FILENAME);
        if env_path.exists() {
            // Existing process env always wins over the file
            let _ = dotenvy::from_path(&env_path);
        }

        let config_path = config_dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: MAI_CONFIG_DIR env var > ./.mai/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(DEFAULT_CONFIG_DIR))
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.server.validate()?;
        self.engine.validate()?;
        self.resilience.validate()?;
        self.proxy.validate()?;

        if self.server.port != 0
            && self.server.port == self.engine.port
            && (self.server.host == self.engine.host || self.server.host == "0.0.0.0")
        {
            return Err(ConfigError::config(format!(
                "server.port and engine.port must differ, both are {}",
                self.server.port
            )));
        }

        let log_dir = Path::new(&self.logging.dir);
        if log_dir.is_absolute() || self.logging.dir.contains("..") {
            return Err(ConfigError::config(
                "logging.dir must be relative and cannot contain '..'",
            ));
        }

        Ok(())
    }

    /// Get bind address as string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Absolute path of the log file, if file logging is configured.
    pub fn log_file_path(&self) -> ConfigErrorResult<Option<PathBuf>> {
        match self.logging.file {
            Some(ref filename) => {
                let log_dir = Self::config_dir()?.join(&self.logging.dir);
                Ok(Some(log_dir.join(filename)))
            }
            None => Ok(None),
        }
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  server: {}:{}", self.server.host, self.server.port);
        info!(
            "  engine: {} on {}:{} (max_tokens={}, python={})",
            self.engine.default_model,
            self.engine.host,
            self.engine.port,
            self.engine.max_tokens,
            self.engine.python
        );
        info!("  models: {}", self.engine.model_directory);
        info!(
            "  resilience: startup={}x{}ms, monitor={}ms, restarts={}, backoff={}^n x {}ms",
            self.resilience.startup_attempts,
            self.resilience.startup_poll_interval_ms,
            self.resilience.health_check_interval_ms,
            self.resilience.max_restart_attempts,
            self.resilience.backoff_base,
            self.resilience.backoff_unit_ms
        );
        info!(
            "  shutdown: grace={}ms, reap={}ms, swap_cooldown={}ms",
            self.resilience.shutdown_grace_ms,
            self.resilience.kill_reap_ms,
            self.resilience.swap_cooldown_ms
        );
        info!(
            "  proxy: request={}s, connect={}ms, health={}ms",
            self.proxy.request_timeout_secs,
            self.proxy.connect_timeout_ms,
            self.proxy.health_timeout_ms
        );
        info!(
            "  logging: {} (colored: {})",
            *self.logging.level, self.logging.colored
        );
    }

    fn apply_env_overrides(&mut self) {
        // Server
        Self::apply_env_string("MAI_SERVER_HOST", &mut self.server.host);
        Self::apply_env_parse("MAI_SERVER_PORT", &mut self.server.port);

        // Engine
        Self::apply_env_string("MAI_ENGINE_DEFAULT_MODEL", &mut self.engine.default_model);
        Self::apply_env_string(
            "MAI_ENGINE_MODEL_DIRECTORY",
            &mut self.engine.model_directory,
        );
        Self::apply_env_string("MAI_ENGINE_HOST", &mut self.engine.host);
        Self::apply_env_parse("MAI_ENGINE_PORT", &mut self.engine.port);
        Self::apply_env_parse("MAI_ENGINE_MAX_TOKENS", &mut self.engine.max_tokens);
        Self::apply_env_string("MAI_ENGINE_PYTHON", &mut self.engine.python);
        Self::apply_env_string("MAI_ENGINE_LOG_LEVEL", &mut self.engine.log_level);

        // Resilience
        Self::apply_env_parse(
            "MAI_STARTUP_ATTEMPTS",
            &mut self.resilience.startup_attempts,
        );
        Self::apply_env_parse(
            "MAI_STARTUP_POLL_INTERVAL_MS",
            &mut self.resilience.startup_poll_interval_ms,
        );
        Self::apply_env_parse(
            "MAI_HEALTH_CHECK_INTERVAL_MS",
            &mut self.resilience.health_check_interval_ms,
        );
        Self::apply_env_parse(
            "MAI_MAX_RESTART_ATTEMPTS",
            &mut self.resilience.max_restart_attempts,
        );
        Self::apply_env_parse("MAI_BACKOFF_BASE", &mut self.resilience.backoff_base);
        Self::apply_env_parse("MAI_BACKOFF_UNIT_MS", &mut self.resilience.backoff_unit_ms);
        Self::apply_env_parse(
            "MAI_SHUTDOWN_GRACE_MS",
            &mut self.resilience.shutdown_grace_ms,
        );
        Self::apply_env_parse("MAI_KILL_REAP_MS", &mut self.resilience.kill_reap_ms);
        Self::apply_env_parse(
            "MAI_SWAP_COOLDOWN_MS",
            &mut self.resilience.swap_cooldown_ms,
        );

        // Proxy
        Self::apply_env_parse(
            "MAI_PROXY_REQUEST_TIMEOUT_SECS",
            &mut self.proxy.request_timeout_secs,
        );
        Self::apply_env_parse(
            "MAI_PROXY_CONNECT_TIMEOUT_MS",
            &mut self.proxy.connect_timeout_ms,
        );
        Self::apply_env_parse(
            "MAI_PROXY_HEALTH_TIMEOUT_MS",
            &mut self.proxy.health_timeout_ms,
        );

        // Logging
        Self::apply_env_parse("MAI_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("MAI_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_option_string("MAI_LOG_FILE", &mut self.logging.file);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}
