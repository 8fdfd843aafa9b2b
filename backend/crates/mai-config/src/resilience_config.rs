use crate::{ConfigError, ConfigErrorResult};

use std::time::Duration;

use serde::Deserialize;

// Startup readiness polling
pub const MIN_STARTUP_ATTEMPTS: u32 = 1;
pub const MAX_STARTUP_ATTEMPTS: u32 = 600;
pub const DEFAULT_STARTUP_ATTEMPTS: u32 = 30;
pub const DEFAULT_STARTUP_POLL_INTERVAL_MS: u64 = 1000;

// Crash monitor
pub const MIN_INTERVAL_MS: u64 = 10;
pub const MAX_INTERVAL_MS: u64 = 3_600_000;
pub const DEFAULT_HEALTH_CHECK_INTERVAL_MS: u64 = 10_000;

// Restart policy
pub const MIN_MAX_RESTART_ATTEMPTS: u32 = 1;
pub const MAX_MAX_RESTART_ATTEMPTS: u32 = 10;
pub const DEFAULT_MAX_RESTART_ATTEMPTS: u32 = 3;

pub const MIN_BACKOFF_BASE: u32 = 1;
pub const MAX_BACKOFF_BASE: u32 = 10;
pub const DEFAULT_BACKOFF_BASE: u32 = 2;
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

// Shutdown and swap
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 10_000;
pub const DEFAULT_KILL_REAP_MS: u64 = 2000;
pub const DEFAULT_SWAP_COOLDOWN_MS: u64 = 2000;

/// Startup, crash-recovery and shutdown timing for the engine process.
///
/// Restart delays grow as `backoff_base^attempt * backoff_unit_ms`, so the
/// defaults give 2s, 4s, 8s for attempts 1-3.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Readiness polls before start() gives up
    pub startup_attempts: u32,
    /// Delay between readiness polls in milliseconds
    pub startup_poll_interval_ms: u64,
    /// Crash monitor tick in milliseconds
    pub health_check_interval_ms: u64,
    /// Consecutive restart attempts before recovery gives up
    pub max_restart_attempts: u32,
    /// Exponential backoff base
    pub backoff_base: u32,
    /// Unit the backoff power is multiplied by, in milliseconds
    pub backoff_unit_ms: u64,
    /// Time allowed between SIGTERM and SIGKILL in milliseconds
    pub shutdown_grace_ms: u64,
    /// Time allowed to reap the group after SIGKILL in milliseconds
    pub kill_reap_ms: u64,
    /// Pause between stop and start during a model swap in milliseconds
    pub swap_cooldown_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            startup_attempts: DEFAULT_STARTUP_ATTEMPTS,
            startup_poll_interval_ms: DEFAULT_STARTUP_POLL_INTERVAL_MS,
            health_check_interval_ms: DEFAULT_HEALTH_CHECK_INTERVAL_MS,
            max_restart_attempts: DEFAULT_MAX_RESTART_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            kill_reap_ms: DEFAULT_KILL_REAP_MS,
            swap_cooldown_ms: DEFAULT_SWAP_COOLDOWN_MS,
        }
    }
}

impl ResilienceConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.startup_attempts < MIN_STARTUP_ATTEMPTS
            || self.startup_attempts > MAX_STARTUP_ATTEMPTS
        {
            return Err(ConfigError::resilience(format!(
                "resilience.startup_attempts must be {}-{}, got {}",
                MIN_STARTUP_ATTEMPTS, MAX_STARTUP_ATTEMPTS, self.startup_attempts
            )));
        }

        Self::validate_interval("startup_poll_interval_ms", self.startup_poll_interval_ms)?;
        Self::validate_interval("health_check_interval_ms", self.health_check_interval_ms)?;

        if self.max_restart_attempts < MIN_MAX_RESTART_ATTEMPTS
            || self.max_restart_attempts > MAX_MAX_RESTART_ATTEMPTS
        {
            return Err(ConfigError::resilience(format!(
                "resilience.max_restart_attempts must be {}-{}, got {}",
                MIN_MAX_RESTART_ATTEMPTS, MAX_MAX_RESTART_ATTEMPTS, self.max_restart_attempts
            )));
        }

        if self.backoff_base < MIN_BACKOFF_BASE || self.backoff_base > MAX_BACKOFF_BASE {
            return Err(ConfigError::resilience(format!(
                "resilience.backoff_base must be {}-{}, got {}",
                MIN_BACKOFF_BASE, MAX_BACKOFF_BASE, self.backoff_base
            )));
        }

        if self.backoff_unit_ms > MAX_INTERVAL_MS {
            return Err(ConfigError::resilience(format!(
                "resilience.backoff_unit_ms must be <= {}, got {}",
                MAX_INTERVAL_MS, self.backoff_unit_ms
            )));
        }

        Self::validate_interval("shutdown_grace_ms", self.shutdown_grace_ms)?;
        Self::validate_interval("kill_reap_ms", self.kill_reap_ms)?;

        if self.swap_cooldown_ms > MAX_INTERVAL_MS {
            return Err(ConfigError::resilience(format!(
                "resilience.swap_cooldown_ms must be <= {}, got {}",
                MAX_INTERVAL_MS, self.swap_cooldown_ms
            )));
        }

        Ok(())
    }

    fn validate_interval(name: &str, value: u64) -> ConfigErrorResult<()> {
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&value) {
            return Err(ConfigError::resilience(format!(
                "resilience.{} must be {}-{}, got {}",
                name, MIN_INTERVAL_MS, MAX_INTERVAL_MS, value
            )));
        }
        Ok(())
    }

    /// Delay before restart attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_base).saturating_pow(attempt);
        Duration::from_millis(factor.saturating_mul(self.backoff_unit_ms))
    }

    pub fn startup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.startup_poll_interval_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn kill_reap(&self) -> Duration {
        Duration::from_millis(self.kill_reap_ms)
    }

    pub fn swap_cooldown(&self) -> Duration {
        Duration::from_millis(self.swap_cooldown_ms)
    }
}
