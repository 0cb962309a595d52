//! Process handle and its lifecycle state machine
//!
//! `Stopped → Starting → Running → Stopping → Stopped`. A handle owns at most
//! one live child process. `start()` is legal only from `Stopped`; `stop()` is
//! legal from anywhere and always ends in `Stopped`.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use super::launch::LaunchSpec;
use crate::config::FORCE_KILL_TIMEOUT;
use crate::error::{HarnessError, HarnessResult};
use shared::{component_debug, component_info, component_warn};

/// Lifecycle state of a [`ProcessHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Stopped => "stopped",
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Owns one spawned OS process described by a [`LaunchSpec`]
pub struct ProcessHandle {
    spec: LaunchSpec,
    state: ProcessState,
    child: Option<Child>,
    log_file: Option<PathBuf>,
}

impl ProcessHandle {
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            state: ProcessState::Stopped,
            child: None,
            log_file: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Log file of the most recent start attempt
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Spawn the process and wait for its health check.
    ///
    /// On a failed health check the process is killed, the handle returns to
    /// `Stopped` and the error carries the log file path.
    pub async fn start(&mut self) -> HarnessResult<()> {
        if self.state != ProcessState::Stopped {
            return Err(HarnessError::IllegalState {
                name: self.spec.name.clone(),
                state: self.state,
                operation: "start".to_string(),
            });
        }

        if !self.spec.artifact.exists() {
            return Err(self.startup_failure(format!("artifact not found: {}", self.spec.artifact.display()), None));
        }

        let (log_path, stdout_log) = self
            .spec
            .log_naming
            .create(&self.spec.log_root, &self.spec.name)
            .map_err(|e| self.startup_failure(format!("cannot create log file: {e}"), None))?;
        self.log_file = Some(log_path.clone());

        let stderr_log = stdout_log
            .try_clone()
            .map_err(|e| self.startup_failure(format!("cannot share log file: {e}"), Some(log_path.clone())))?;

        let command_line = self.spec.command_line();
        component_debug!(self.spec.name, "Working directory: {:?}", command_line.working_dir);
        component_debug!(self.spec.name, "Command: {}", command_line.display());

        let mut cmd = Command::new(&command_line.program);
        cmd.args(&command_line.args)
            .envs(&command_line.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log))
            .kill_on_drop(true);
        if let Some(dir) = &command_line.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| self.startup_failure(format!("failed to spawn: {e}"), Some(log_path.clone())))?;

        component_debug!(
            self.spec.name,
            "🚀 Started {} with PID: {}",
            self.spec.name,
            child.id().unwrap_or(0)
        );
        self.child = Some(child);
        self.state = ProcessState::Starting;

        let healthy = timeout(
            self.spec.startup_timeout,
            self.spec.health_check.check(self.spec.startup_timeout),
        )
        .await
        .unwrap_or(false);

        if healthy {
            self.state = ProcessState::Running;
            component_info!(self.spec.name, "✅ {} is healthy", self.spec.name);
            Ok(())
        } else {
            component_warn!(
                self.spec.name,
                "❌ {} failed health check within {:?}",
                self.spec.name,
                self.spec.startup_timeout
            );
            self.force_stop().await;
            Err(self.startup_failure("failed health check".to_string(), Some(log_path)))
        }
    }

    /// Stop the process: SIGTERM, wait up to the grace period, then kill.
    ///
    /// Idempotent; always leaves the handle `Stopped`.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            self.state = ProcessState::Stopped;
            return;
        };

        if !matches!(child.try_wait(), Ok(None)) {
            component_debug!(self.spec.name, "{} already exited", self.spec.name);
            self.state = ProcessState::Stopped;
            return;
        }

        self.state = ProcessState::Stopping;
        component_debug!(self.spec.name, "🛑 Stopping {}", self.spec.name);

        terminate_gracefully(&mut child, &self.spec.name);

        match timeout(self.spec.grace_period, child.wait()).await {
            Ok(_) => {
                component_debug!(self.spec.name, "{} stopped", self.spec.name);
            }
            Err(_) => {
                component_warn!(
                    self.spec.name,
                    "🔨 {} did not stop gracefully, forcing shutdown",
                    self.spec.name
                );
                force_kill(&mut child, &self.spec.name).await;
            }
        }

        self.state = ProcessState::Stopped;
    }

    /// True only when `Running` and the child has not exited
    pub fn is_running(&mut self) -> bool {
        if self.state != ProcessState::Running {
            return false;
        }
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn force_stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            force_kill(&mut child, &self.spec.name).await;
        }
        self.state = ProcessState::Stopped;
    }

    fn startup_failure(&self, reason: String, log_file: Option<PathBuf>) -> HarnessError {
        HarnessError::StartupFailure {
            name: self.spec.name.clone(),
            reason,
            log_file,
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("name", &self.spec.name)
            .field("state", &self.state)
            .field("pid", &self.pid())
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // Emergency cleanup - a handle dropped without stop() still kills its child
        if let Some(child) = self.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                component_warn!(self.spec.name, "🚨 Emergency cleanup: force killing {}", self.spec.name);
                let _ = child.start_kill();
            }
        }
    }
}

#[cfg(unix)]
fn terminate_gracefully(child: &mut Child, name: &str) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };

    match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => component_debug!(name, "📤 Sent SIGTERM to {} ({})", name, pid),
        Err(nix::errno::Errno::ESRCH) => component_debug!(name, "{} ({}) already gone", name, pid),
        Err(e) => {
            component_warn!(name, "⚠️ Failed to send SIGTERM to {}: {}", name, e);
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn terminate_gracefully(child: &mut Child, _name: &str) {
    let _ = child.start_kill();
}

async fn force_kill(child: &mut Child, name: &str) {
    if let Err(e) = child.start_kill() {
        component_debug!(name, "Kill of {} reported: {}", name, e);
    }
    if timeout(FORCE_KILL_TIMEOUT, child.wait()).await.is_err() {
        component_warn!(name, "⚠️ {} still alive {:?} after kill", name, FORCE_KILL_TIMEOUT);
    }
}
