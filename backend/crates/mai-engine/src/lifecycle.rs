//! Engine process lifecycle with crash recovery.

use crate::process_handle::{Liveness, ProcessHandle};
use crate::server_status::StatusSnapshot;
use crate::{
    EngineLauncher, EngineProxy, EngineState, HealthProber, HealthStatus, MlxLauncher,
    ProxyRequest, ProxyResponse, RestartState, ServerStatus, SupervisorError, SupervisorResult,
    monitor,
};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use error_location::ErrorLocation;
use mai_config::Config;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Owns the engine process and everything that may replace it.
///
/// Responsibilities:
/// - Start the engine in its own process group and wait for readiness
/// - Stop it gracefully, escalating to a group kill
/// - Hot-swap the model (stop, cooldown, start)
/// - Run the crash monitor and its bounded backoff restarts
/// - Forward inference requests while a healthy engine is current
///
/// Every lifecycle transition holds one mutex. Status reads and proxy
/// calls go through a published snapshot instead.
#[derive(Clone)]
pub struct EngineSupervisor {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: Config,
    launcher: Arc<dyn EngineLauncher>,
    health: HealthProber,
    proxy: EngineProxy,
    pub(crate) lifecycle: Mutex<Lifecycle>,
    status_tx: watch::Sender<StatusSnapshot>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    listen_port: AtomicU16,
}

/// State guarded by the lifecycle mutex.
pub(crate) struct Lifecycle {
    handle: Option<ProcessHandle>,
    pub(crate) restart: RestartState,
    state: EngineState,
    pub(crate) last_model: Option<String>,
    last_exit_code: Option<i32>,
    last_error: Option<String>,
    pub(crate) monitor: Option<JoinHandle<()>>,
}

impl Lifecycle {
    /// Poll-and-clear. Returns the exit code (possibly unknown) when a
    /// recorded process turned out to be gone.
    pub(crate) fn reap_exited(&mut self) -> Option<Option<i32>> {
        let handle = self.handle.as_mut()?;
        match handle.poll() {
            Liveness::Alive => None,
            Liveness::Exited { code } => {
                self.handle = None;
                self.last_exit_code = code;
                Some(code)
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        self.reap_exited();
        self.handle.is_some()
    }
}

enum StartupOutcome {
    Healthy,
    Exited { code: Option<i32> },
    TimedOut,
}

impl EngineSupervisor {
    /// Create a supervisor that launches `mlx_lm.server`.
    pub fn new(config: Config) -> SupervisorResult<Self> {
        Self::with_launcher(config, Arc::new(MlxLauncher))
    }

    /// Create a supervisor with a custom engine command.
    pub fn with_launcher(
        config: Config,
        launcher: Arc<dyn EngineLauncher>,
    ) -> SupervisorResult<Self> {
        let health = HealthProber::new(&config.engine, &config.proxy)?;
        let proxy = EngineProxy::new(&config.engine, &config.proxy)?;
        let (status_tx, _) = watch::channel(StatusSnapshot::stopped());
        let (shutdown_tx, _) = watch::channel(false);

        let lifecycle = Lifecycle {
            handle: None,
            restart: RestartState::new(config.resilience.max_restart_attempts),
            state: EngineState::Stopped,
            last_model: None,
            last_exit_code: None,
            last_error: None,
            monitor: None,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                listen_port: AtomicU16::new(config.server.port),
                config,
                launcher,
                health,
                proxy,
                lifecycle: Mutex::new(lifecycle),
                status_tx,
                shutdown_tx,
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Start the engine with `model`, or the configured default.
    ///
    /// Succeeds immediately if a process is already alive. A crash while
    /// loading goes through the backoff restart path; a process that stays
    /// alive but never answers is reported and left running.
    pub async fn start(&self, model: Option<&str>) -> SupervisorResult<()> {
        self.ensure_not_shutting_down()?;

        let mut lc = self.inner.lifecycle.lock().await;
        if lc.is_alive() {
            if let (Some(requested), Some(handle)) = (model, lc.handle.as_ref())
                && requested != handle.model()
            {
                warn!(
                    "Engine already running {}, ignoring start request for {requested}",
                    handle.model()
                );
            }
            return Ok(());
        }

        // A manual start always gets a fresh restart budget
        lc.restart.reset();

        let model = model
            .unwrap_or(self.inner.config.engine.default_model.as_str())
            .to_string();
        let result = self.inner.start_locked(&mut lc, &model).await;

        if result.is_ok() {
            self.ensure_monitor_locked(&mut lc);
        }
        result
    }

    /// Stop the engine. A no-op when nothing is running.
    pub async fn stop(&self) -> SupervisorResult<()> {
        let mut lc = self.inner.lifecycle.lock().await;
        self.inner.stop_locked(&mut lc).await;
        Ok(())
    }

    /// Replace the running model: stop, let memory settle, start.
    ///
    /// Ends with either `model` running and healthy or the engine stopped.
    pub async fn swap_model(&self, model: &str) -> SupervisorResult<()> {
        self.ensure_not_shutting_down()?;

        let mut lc = self.inner.lifecycle.lock().await;
        let previous = lc.handle.as_ref().map(|h| h.model().to_string());
        info!(
            "Hot-swapping model: {} -> {model}",
            previous.as_deref().unwrap_or("<none>")
        );

        self.inner.stop_locked(&mut lc).await;
        tokio::time::sleep(self.inner.config.resilience.swap_cooldown()).await;

        lc.restart.reset();
        match self.inner.start_locked(&mut lc, model).await {
            Ok(()) => {
                self.ensure_monitor_locked(&mut lc);
                info!("Model {model} loaded");
                Ok(())
            }
            Err(e @ SupervisorError::StartupTimeout { .. }) => {
                warn!("Swap to {model} never became healthy, stopping it");
                self.inner.stop_locked(&mut lc).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Current status. May lag the lifecycle by one transition.
    pub fn status(&self) -> ServerStatus {
        self.reap_unmonitored();
        let snapshot = self.inner.status_tx.borrow().clone();
        ServerStatus::from_snapshot(
            &snapshot,
            self.inner.listen_port.load(Ordering::Relaxed),
            self.inner.config.engine.port,
        )
    }

    /// Probe the engine's health endpoint once.
    pub async fn check_health(&self) -> HealthStatus {
        self.inner.health.check().await
    }

    /// Record the port the API actually bound (matters when configured as 0).
    pub fn set_listen_port(&self, port: u16) {
        self.inner.listen_port.store(port, Ordering::Relaxed);
    }

    /// Forward a request to the current engine.
    ///
    /// Fails fast with `EngineUnavailable` when no health-confirmed process
    /// is current, without touching the network.
    pub async fn proxy(&self, request: ProxyRequest) -> SupervisorResult<ProxyResponse> {
        if !self.inner.status_tx.borrow().is_serving() {
            return Err(SupervisorError::engine_unavailable(
                "no healthy engine process is running",
            ));
        }
        self.inner.proxy.forward(request).await
    }

    /// Stop the crash monitor, then the engine. Further lifecycle calls fail.
    pub async fn shutdown(&self) {
        if self.inner.shutdown_tx.send_replace(true) {
            return;
        }
        info!("Shutting down engine supervisor");

        let monitor = {
            let mut lc = self.inner.lifecycle.lock().await;
            lc.restart.monitoring_active = false;
            lc.monitor.take()
        };

        if let Some(handle) = monitor
            && let Err(e) = handle.await
        {
            warn!("Crash monitor ended abnormally: {e}");
        }

        let mut lc = self.inner.lifecycle.lock().await;
        self.inner.stop_locked(&mut lc).await;
        info!("Engine supervisor shut down");
    }

    /// Poll-and-clear for a process no monitor is watching, such as one
    /// left running after a startup timeout. Skipped while a transition
    /// holds the lock; that transition publishes its own result.
    fn reap_unmonitored(&self) {
        let Ok(mut lc) = self.inner.lifecycle.try_lock() else {
            return;
        };
        if lc.restart.monitoring_active {
            return;
        }

        if let Some(code) = lc.reap_exited() {
            warn!("Unmonitored engine process exited (code {code:?})");
            if !matches!(lc.state, EngineState::Failed { .. }) {
                lc.state = EngineState::Stopped;
            }
            lc.last_error = Some(format!("exited while unmonitored (code {code:?})"));
            self.inner.publish(&lc);
        }
    }

    fn ensure_not_shutting_down(&self) -> SupervisorResult<()> {
        if *self.inner.shutdown_tx.borrow() {
            return Err(SupervisorError::shutting_down());
        }
        Ok(())
    }

    /// Launch the crash monitor unless one is still alive. Must be called
    /// with the lifecycle lock held: the monitor only exits under the same
    /// lock, after clearing its slot.
    fn ensure_monitor_locked(&self, lc: &mut Lifecycle) {
        lc.restart.monitoring_active = true;

        let alive = lc.monitor.as_ref().is_some_and(|h| !h.is_finished());
        if !alive {
            lc.monitor = Some(tokio::spawn(monitor::run(Arc::clone(&self.inner))));
        }

        self.inner.publish(lc);
    }
}

impl Inner {
    async fn start_locked(&self, lc: &mut Lifecycle, model: &str) -> SupervisorResult<()> {
        match self.launch_and_wait(lc, model).await? {
            StartupOutcome::Healthy => Ok(()),
            StartupOutcome::Exited { code } => {
                warn!("Engine for {model} exited during startup (code {code:?})");
                self.recover_locked(lc, model).await
            }
            StartupOutcome::TimedOut => Err(SupervisorError::StartupTimeout {
                model: model.to_string(),
                attempts: self.config.resilience.startup_attempts,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Spawn one process and poll it until healthy, dead, or out of attempts.
    async fn launch_and_wait(
        &self,
        lc: &mut Lifecycle,
        model: &str,
    ) -> SupervisorResult<StartupOutcome> {
        lc.state = EngineState::Starting;
        lc.last_model = Some(model.to_string());
        lc.last_error = None;
        self.publish(lc);

        info!("Starting engine with model: {model}");
        let command = self.launcher.command(&self.config.engine, model);
        let handle = match ProcessHandle::spawn(command, model) {
            Ok(handle) => handle,
            Err(e) => {
                error!("{e}");
                lc.state = EngineState::Failed {
                    error: e.to_string(),
                };
                lc.last_error = Some(e.to_string());
                self.publish(lc);
                return Err(e);
            }
        };
        lc.handle = Some(handle);
        self.publish(lc);

        let attempts = self.config.resilience.startup_attempts;
        let interval = self.config.resilience.startup_poll_interval();

        for attempt in 1..=attempts {
            if let Some(code) = lc.reap_exited() {
                return Ok(self.startup_exited(lc, code));
            }

            if self.health.is_healthy().await {
                lc.restart.reset();
                lc.state = EngineState::Running;
                self.publish(lc);
                info!(
                    "Engine ready on {} after {attempt} check(s)",
                    self.health.url()
                );
                return Ok(StartupOutcome::Healthy);
            }

            debug!("Engine not ready yet ({attempt}/{attempts})");
            if attempt < attempts && !self.sleep_unless_shutdown(interval).await {
                info!("Startup of {model} cancelled by shutdown");
                self.terminate_locked(lc).await;
                lc.state = EngineState::Stopped;
                self.publish(lc);
                return Err(SupervisorError::shutting_down());
            }
        }

        if let Some(code) = lc.reap_exited() {
            return Ok(self.startup_exited(lc, code));
        }

        warn!("Engine for {model} is alive but not healthy after {attempts} checks");
        lc.state = EngineState::Unhealthy;
        lc.last_error = Some(format!("not healthy after {attempts} checks"));
        self.publish(lc);
        Ok(StartupOutcome::TimedOut)
    }

    fn startup_exited(&self, lc: &mut Lifecycle, code: Option<i32>) -> StartupOutcome {
        lc.state = EngineState::Stopped;
        lc.last_error = Some(format!("exited during startup (code {code:?})"));
        self.publish(lc);
        StartupOutcome::Exited { code }
    }

    /// Bounded exponential-backoff restart with the last-known model.
    ///
    /// Each pass consumes one attempt. When the budget is spent the engine
    /// is left stopped in `Failed` with the counter reset, and monitoring
    /// ends until a manual start.
    pub(crate) async fn recover_locked(
        &self,
        lc: &mut Lifecycle,
        model: &str,
    ) -> SupervisorResult<()> {
        loop {
            let Some(attempt) = lc.restart.next_attempt() else {
                let attempts = lc.restart.max_attempts;
                error!(
                    "Engine for {model} failed {attempts} restart attempts, manual start required"
                );
                let e = SupervisorError::RecoveryExhausted {
                    model: model.to_string(),
                    attempts,
                    location: ErrorLocation::from(Location::caller()),
                };
                lc.restart.monitoring_active = false;
                lc.state = EngineState::Failed {
                    error: e.to_string(),
                };
                lc.last_error = Some(e.to_string());
                self.publish(lc);
                return Err(e);
            };

            let delay = self.config.resilience.backoff_delay(attempt);
            warn!(
                "Restarting engine for {model} in {delay:?} (attempt {attempt}/{})",
                lc.restart.max_attempts
            );
            lc.state = EngineState::Restarting { attempt };
            self.publish(lc);

            if !self.sleep_unless_shutdown(delay).await {
                info!("Restart of {model} cancelled by shutdown");
                lc.restart.reset();
                lc.state = EngineState::Stopped;
                self.publish(lc);
                return Err(SupervisorError::shutting_down());
            }

            match self.launch_and_wait(lc, model).await {
                Ok(StartupOutcome::Healthy) => {
                    info!("Engine for {model} recovered on attempt {attempt}");
                    return Ok(());
                }
                Ok(StartupOutcome::Exited { code }) => {
                    warn!("Restart attempt {attempt} exited (code {code:?})");
                }
                Ok(StartupOutcome::TimedOut) => {
                    warn!("Restart attempt {attempt} never became healthy, stopping it");
                    self.terminate_locked(lc).await;
                }
                Err(e @ SupervisorError::ShuttingDown { .. }) => {
                    lc.restart.reset();
                    self.publish(lc);
                    return Err(e);
                }
                Err(e) => {
                    error!("Restart attempt {attempt} could not launch the engine: {e}");
                    lc.restart.reset();
                    lc.restart.monitoring_active = false;
                    self.publish(lc);
                    return Err(e);
                }
            }
        }
    }

    /// Sleep unless the supervisor shuts down first. False when cancelled.
    async fn sleep_unless_shutdown(&self, delay: Duration) -> bool {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = shutdown_rx.wait_for(|stop| *stop) => false,
        }
    }

    async fn stop_locked(&self, lc: &mut Lifecycle) {
        lc.restart.monitoring_active = false;

        if lc.handle.is_none() {
            if !matches!(lc.state, EngineState::Failed { .. }) {
                lc.state = EngineState::Stopped;
            }
            self.publish(lc);
            return;
        }

        info!("Stopping engine...");
        self.terminate_locked(lc).await;
        lc.state = EngineState::Stopped;
        self.publish(lc);
        info!("Engine stopped");
    }

    async fn terminate_locked(&self, lc: &mut Lifecycle) {
        let Some(handle) = lc.handle.take() else {
            return;
        };

        lc.state = EngineState::ShuttingDown;
        self.publish(lc);

        let resilience = &self.config.resilience;
        let code = handle
            .terminate(resilience.shutdown_grace(), resilience.kill_reap())
            .await;
        lc.last_exit_code = code;
    }

    pub(crate) fn publish(&self, lc: &Lifecycle) {
        let model = match lc.handle {
            Some(ref handle) => Some(handle.model().to_string()),
            None if matches!(
                lc.state,
                EngineState::Starting | EngineState::Restarting { .. }
            ) =>
            {
                lc.last_model.clone()
            }
            None => None,
        };

        self.status_tx.send_replace(StatusSnapshot {
            state: lc.state.clone(),
            model,
            pid: lc.handle.as_ref().map(ProcessHandle::pid),
            started_at: lc.handle.as_ref().map(ProcessHandle::started_at),
            started_at_utc: lc.handle.as_ref().map(ProcessHandle::started_at_utc),
            restart_attempts: lc.restart.count,
            monitoring: lc.restart.monitoring_active,
            last_exit_code: lc.last_exit_code,
            last_error: lc.last_error.clone(),
        });
    }
}
