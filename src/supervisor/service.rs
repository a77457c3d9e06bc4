//! Supervised service - spawn-time process handles with stdio redirection
//!
//! A managed server is either *spawned* (we hold the OS child handle captured
//! at spawn time) or *adopted* (found in the process table by image name, pid
//! only). The handle is what shutdown prefers; name-based adoption is the
//! fallback for servers an operator started by hand.

use std::path::{Path, PathBuf};
use anyhow::Result;
use tokio::process::{Child, Command};

use super::error::SupervisorError;
use crate::process_monitor;

/// Directory spawned server output is captured into (`logs/<service>.log`).
const LOG_DIR: &str = "logs";

// ─── Service Spec ────────────────────────────────────────────

/// Everything needed to ensure one server is running.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Service id ("backend", "gateway") — used for log file names
    pub name: String,
    /// Image (file) name to look for in the host process table
    pub process_name: String,
    /// Executable to spawn when absent
    pub executable: PathBuf,
    /// Launch arguments
    pub args: Vec<String>,
}

impl ServiceSpec {
    pub fn new(name: &str, executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let executable = executable.into();
        let process_name = executable
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            process_name,
            executable,
            args,
        }
    }
}

// ─── Supervised Process ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    NotStarted,
    Running,
    /// Detection could not tell — e.g. the pid vanished between scans
    Unknown,
}

/// One running managed server.
#[derive(Debug)]
pub struct SupervisedProcess {
    pub name: String,
    pub pid: u32,
    /// True when we found the process in the table instead of spawning it
    pub adopted: bool,
    /// Present only for processes we spawned ourselves
    child: Option<Child>,
    state: ServiceState,
}

impl SupervisedProcess {
    pub fn spawned(name: &str, pid: u32, child: Child) -> Self {
        Self {
            name: name.to_string(),
            pid,
            adopted: false,
            child: Some(child),
            state: ServiceState::Running,
        }
    }

    pub fn adopted(name: &str, pid: u32) -> Self {
        Self {
            name: name.to_string(),
            pid,
            adopted: true,
            child: None,
            state: ServiceState::Running,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Re-check liveness against the process table.
    pub async fn is_alive(&mut self) -> bool {
        let alive = process_monitor::is_running_async(self.pid).await;
        if !alive {
            self.state = ServiceState::Unknown;
        }
        alive
    }

    /// Hard-kill the process. No graceful signal is sent; the server gets no
    /// chance to flush state. Already-exited processes are not an error.
    pub async fn stop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            match child.kill().await {
                Ok(()) => tracing::info!("Killed spawned process '{}' (pid: {})", self.name, self.pid),
                Err(e) => tracing::debug!("Process '{}' already gone: {}", self.name, e),
            }
        } else if let Err(e) = force_kill_pid(self.pid) {
            // 이미 종료된 프로세스는 무시
            tracing::debug!("Force-kill of adopted '{}' (pid {}): {}", self.name, self.pid, e);
        } else {
            tracing::info!("Killed adopted process '{}' (pid: {})", self.name, self.pid);
        }
        self.state = ServiceState::NotStarted;
    }
}

// ─── Spawning ────────────────────────────────────────────────

/// Spawn the service detached, fire-and-forget: stdin null, stdout/stderr
/// appended to `logs/<service>.log`, no waiting on the child. The returned
/// handle is kept for shutdown only.
pub async fn spawn_detached(spec: &ServiceSpec) -> Result<SupervisedProcess, SupervisorError> {
    if !spec.executable.exists() {
        return Err(SupervisorError::ExecutableNotFound(spec.executable.clone()));
    }

    let log_file = open_log_file(&spec.name)
        .map_err(|e| SupervisorError::Internal(e.into()))?;
    let log_clone = log_file
        .try_clone()
        .map_err(|e| SupervisorError::Internal(e.into()))?;

    let mut cmd = Command::new(&spec.executable);
    cmd.args(&spec.args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::from(log_file))
        .stderr(std::process::Stdio::from(log_clone))
        .kill_on_drop(false);

    crate::utils::detach(&mut cmd);

    let child = cmd.spawn().map_err(|e| SupervisorError::SpawnFailed {
        name: spec.name.clone(),
        source: e,
    })?;

    let pid = child
        .id()
        .ok_or_else(|| SupervisorError::NoPid(spec.name.clone()))?;

    tracing::info!(
        "Spawned '{}' ({}) with PID {} — output in {}/{}.log",
        spec.name,
        spec.executable.display(),
        pid,
        LOG_DIR,
        spec.name
    );
    Ok(SupervisedProcess::spawned(&spec.name, pid, child))
}

fn open_log_file(service: &str) -> std::io::Result<std::fs::File> {
    std::fs::create_dir_all(LOG_DIR)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(LOG_DIR).join(format!("{}.log", service)))
}

/// Force-kill a process by PID. Cross-platform helper for adopted processes
/// where no child handle exists.
pub fn force_kill_pid(pid: u32) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
        use winapi::um::winnt::PROCESS_TERMINATE;

        unsafe {
            let handle = OpenProcess(PROCESS_TERMINATE, 0, pid);
            if handle.is_null() {
                anyhow::bail!("Failed to open process {}", pid);
            }
            let result = TerminateProcess(handle, 1);
            CloseHandle(handle);
            if result == 0 {
                anyhow::bail!("TerminateProcess failed for PID {}", pid);
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
            .map_err(|e| anyhow::anyhow!("Failed to send SIGKILL to PID {}: {}", pid, e))?;
    }
    Ok(())
}
