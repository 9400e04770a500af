//! Process utilities for ratchet
//!
//! - `executor`: run one shell command with captured output and cancellation
//! - `group`: per-platform process-group isolation and teardown
//! - `cancel`: the cancellation token shared with the interrupt handler

mod cancel;
mod executor;
mod group;

pub use cancel::CancellationToken;
pub use executor::{CommandError, CommandExecutor, TERMINATION_GRACE};
pub use group::{PlatformProcessGroup, ProcessGroup};

/// Check if a process with the given PID is alive
///
/// Sends the null signal, which distinguishes a live process we may not
/// signal (`EPERM`) from one that does not exist (`ESRCH`).
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };

    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Without a cheap liveness check every process is assumed alive.
#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    true
}
