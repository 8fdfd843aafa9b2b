//! One running engine process and its process group.

use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::{debug, info, warn};

/// Result of polling the OS for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Exited { code: Option<i32> },
}

/// The live child process. Never handed out of the supervisor; status
/// snapshots copy the fields they need.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: u32,
    pgid: i32,
    model: String,
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
}

impl ProcessHandle {
    /// Spawn `command` as the leader of a new session so a single signal
    /// reaches everything the engine itself spawns.
    pub fn spawn(mut command: Command, model: &str) -> SupervisorResult<Self> {
        let program = command.get_program().to_string_lossy().into_owned();

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                command.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        let mut child = tokio::process::Command::from(command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::LaunchFailed {
                program: program.clone(),
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let pid = child.id().ok_or_else(|| SupervisorError::LaunchFailed {
            program: program.clone(),
            source: std::io::Error::other("process exited before its pid was read"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, pid, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, pid, "stderr");
        }

        info!("Spawned engine process {program} (PID {pid}) for model {model}");

        Ok(Self {
            child,
            pid,
            // setsid makes the child its own group leader
            pgid: pid as i32,
            model: model.to_string(),
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn pgid(&self) -> i32 {
        self.pgid
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn started_at_utc(&self) -> DateTime<Utc> {
        self.started_at_utc
    }

    /// Ask the OS whether the process is still there, reaping it if not.
    ///
    /// An exited leader takes the rest of its process group down with it.
    pub fn poll(&mut self) -> Liveness {
        let code = match self.child.try_wait() {
            Ok(None) => return Liveness::Alive,
            Ok(Some(status)) => exit_code(status),
            Err(e) => {
                warn!("Failed to poll engine process {}: {e}", self.pid);
                None
            }
        };
        self.kill_group_stragglers();
        Liveness::Exited { code }
    }

    /// Graceful-then-forceful shutdown of the whole process group.
    ///
    /// SIGTERM goes to the group, then up to `grace` is allowed for exit.
    /// After that the group gets SIGKILL and `reap` more to be collected.
    /// Returns the exit code when one was observed.
    pub async fn terminate(mut self, grace: Duration, reap: Duration) -> Option<i32> {
        if let Liveness::Exited { code } = self.poll() {
            debug!("Engine process {} already exited", self.pid);
            return code;
        }

        info!("Sending SIGTERM to engine process group {}", self.pgid);
        self.signal_group_term();

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("Engine process {} exited: {status}", self.pid);
                self.kill_group_stragglers();
                return exit_code(status);
            }
            Ok(Err(e)) => warn!("Failed to wait for engine process {}: {e}", self.pid),
            Err(_) => warn!(
                "Engine process {} ignored SIGTERM for {grace:?}, force killing",
                self.pid
            ),
        }

        self.signal_group_kill();

        match tokio::time::timeout(reap, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!("Engine process {} killed: {status}", self.pid);
                exit_code(status)
            }
            Ok(Err(e)) => {
                warn!("Failed to reap engine process {}: {e}", self.pid);
                None
            }
            Err(_) => {
                warn!(
                    "Engine process {} not reaped within {reap:?} after SIGKILL",
                    self.pid
                );
                None
            }
        }
    }

    #[cfg(unix)]
    fn signal_group_term(&mut self) {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(self.pgid), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!("SIGTERM to process group {} failed: {e}", self.pgid),
        }
    }

    #[cfg(unix)]
    fn signal_group_kill(&mut self) {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(self.pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!("SIGKILL to process group {} failed: {e}", self.pgid),
        }
    }

    /// Descendants can outlive the leader in the same group.
    #[cfg(unix)]
    fn kill_group_stragglers(&mut self) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if killpg(Pid::from_raw(self.pgid), Signal::SIGKILL).is_ok() {
            debug!("Killed leftover members of process group {}", self.pgid);
        }
    }

    #[cfg(not(unix))]
    fn signal_group_term(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!("Failed to stop engine process {}: {e}", self.pid);
        }
    }

    #[cfg(not(unix))]
    fn signal_group_kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!("Failed to kill engine process {}: {e}", self.pid);
        }
    }

    #[cfg(not(unix))]
    fn kill_group_stragglers(&mut self) {}
}

fn exit_code(status: ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        // Shell convention for "killed by signal"
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }
    status.code()
}

/// Forward the child's output into our log line by line so the pipe
/// never fills up and blocks the engine.
fn forward_output<R>(reader: R, pid: u32, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => info!(target: "mai_engine::child", "[engine {pid} {stream}] {line}"),
                Ok(None) => break,
                Err(e) => {
                    debug!("Stopped reading engine {stream} for PID {pid}: {e}");
                    break;
                }
            }
        }
    });
}
