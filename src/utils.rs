//! Shared helpers for the chatdock orchestrator.

use tokio::process::Command;

/// Detach a child from the orchestrator's console/session so it survives the
/// orchestrator and never draws a window.
///
/// Windows: `CREATE_NO_WINDOW`. Unix: new process group, so terminal signals
/// aimed at the orchestrator (Ctrl+C) do not reach the managed servers.
#[cfg(target_os = "windows")]
pub fn detach(cmd: &mut Command) -> &mut Command {
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(target_os = "windows"))]
pub fn detach(cmd: &mut Command) -> &mut Command {
    cmd.process_group(0)
}
