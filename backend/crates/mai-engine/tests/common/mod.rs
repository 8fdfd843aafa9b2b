#![allow(dead_code)]

//! Test infrastructure for mai-engine supervisor tests

use mai_config::{Config, EngineConfig, ProxyConfig, ResilienceConfig, ServerConfig};
use mai_engine::{EngineLauncher, EngineSupervisor, ServerStatus};

use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Runs `sh -c <script>` for each launch. Launch N uses script N, the last
/// script repeats once the list runs out.
#[derive(Debug)]
pub struct ScriptedLauncher {
    scripts: Vec<String>,
    launches: Mutex<Vec<String>>,
}

impl ScriptedLauncher {
    pub fn new(scripts: &[&str]) -> Arc<Self> {
        assert!(!scripts.is_empty(), "at least one script is required");
        Arc::new(Self {
            scripts: scripts.iter().map(|s| s.to_string()).collect(),
            launches: Mutex::new(Vec::new()),
        })
    }

    pub fn always(script: &str) -> Arc<Self> {
        Self::new(&[script])
    }

    /// Models passed to each launch, in order
    pub fn launches(&self) -> Vec<String> {
        self.launches.lock().unwrap().clone()
    }
}

impl EngineLauncher for ScriptedLauncher {
    fn command(&self, _engine: &EngineConfig, model: &str) -> Command {
        let mut launches = self.launches.lock().unwrap();
        let index = launches.len().min(self.scripts.len() - 1);
        launches.push(model.to_string());

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.scripts[index]);
        cmd
    }
}

/// Long-lived process that exits promptly on SIGTERM
pub const LONG_RUNNING: &str = "exec sleep 30";

/// Crashes right away
pub const CRASH_IMMEDIATELY: &str = "exit 1";

/// Config with millisecond timings, pointed at `engine_port`.
pub fn fast_config(engine_port: u16) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        engine: EngineConfig {
            default_model: "default-model".to_string(),
            host: "127.0.0.1".to_string(),
            port: engine_port,
            ..EngineConfig::default()
        },
        resilience: ResilienceConfig {
            startup_attempts: 5,
            startup_poll_interval_ms: 20,
            health_check_interval_ms: 50,
            max_restart_attempts: 3,
            backoff_base: 2,
            backoff_unit_ms: 10,
            shutdown_grace_ms: 500,
            kill_reap_ms: 500,
            swap_cooldown_ms: 10,
        },
        proxy: ProxyConfig {
            request_timeout_secs: 5,
            connect_timeout_ms: 200,
            health_timeout_ms: 200,
        },
        ..Config::default()
    }
}

/// Fake engine answering the health endpoint with 200.
pub async fn healthy_engine() -> MockServer {
    let server = MockServer::start().await;
    mount_health(&server, 200).await;
    server
}

/// Fake engine answering the health endpoint with 503.
pub async fn unhealthy_engine() -> MockServer {
    let server = MockServer::start().await;
    mount_health(&server, 503).await;
    server
}

pub async fn mount_health(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(json!({"object": "list", "data": []})),
        )
        .mount(server)
        .await;
}

pub fn supervisor_for(
    server: &MockServer,
    launcher: Arc<ScriptedLauncher>,
) -> EngineSupervisor {
    supervisor_with(fast_config(server.address().port()), launcher)
}

pub fn supervisor_with(config: Config, launcher: Arc<ScriptedLauncher>) -> EngineSupervisor {
    EngineSupervisor::with_launcher(config, launcher).unwrap()
}

/// Poll the status until `predicate` holds or `timeout` passes.
pub async fn wait_for_status<F>(
    supervisor: &EngineSupervisor,
    timeout: Duration,
    predicate: F,
) -> ServerStatus
where
    F: Fn(&ServerStatus) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let status = supervisor.status();
        if predicate(&status) || tokio::time::Instant::now() >= deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Number of requests the fake engine received on `request_path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

/// Pids written to `pid_file`, one per line, by scripts that record `$$`
/// or `$!` there.
pub fn recorded_pids(pid_file: &std::path::Path) -> Vec<i32> {
    std::fs::read_to_string(pid_file)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// True while `pid` is a live (non-zombie) process.
pub fn process_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    if kill(Pid::from_raw(pid), None).is_err() {
        return false;
    }
    // Orphans are reaped by init; until then they show up as zombies
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

/// Wait until none of `pids` is alive, or `timeout` passes.
pub async fn wait_until_gone(pids: &[i32], timeout: Duration) -> Vec<i32> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let alive: Vec<i32> = pids.iter().copied().filter(|&p| process_alive(p)).collect();
        if alive.is_empty() || tokio::time::Instant::now() >= deadline {
            return alive;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
