//! Process-group isolation for spawned commands.
//!
//! A metric command frequently spawns its own children (test runners, build
//! tools). Each command is started as the leader of a fresh process group so
//! that cancellation reaches the whole tree, not just the shell.

use std::process::{Child, Command};
use std::time::Duration;

/// Platform capability for starting a command in its own group and tearing
/// that group down again.
pub trait ProcessGroup: Send + Sync {
    /// Configure `cmd` so the spawned child leads a new process group.
    fn configure(&self, cmd: &mut Command);

    /// Terminate the child's whole group: graceful signal, `grace` pause,
    /// forceful kill. The caller is responsible for reaping the child.
    fn terminate(&self, child: &mut Child, grace: Duration);
}

#[cfg(unix)]
pub use unix::UnixProcessGroup as PlatformProcessGroup;

#[cfg(windows)]
pub use windows::WindowsProcessGroup as PlatformProcessGroup;

#[cfg(unix)]
mod unix {
    use std::os::unix::process::CommandExt;
    use std::process::{Child, Command};
    use std::thread;
    use std::time::Duration;

    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::{getpgid, Pid};
    use tracing::{debug, warn};

    use super::ProcessGroup;

    /// `setpgid`-based groups, signalled with `killpg`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UnixProcessGroup;

    impl ProcessGroup for UnixProcessGroup {
        fn configure(&self, cmd: &mut Command) {
            cmd.process_group(0);
        }

        fn terminate(&self, child: &mut Child, grace: Duration) {
            let pgid = i32::try_from(child.id())
                .ok()
                .and_then(|pid| getpgid(Some(Pid::from_raw(pid))).ok());

            let Some(pgid) = pgid else {
                // Group lookup failed, fall back to the direct child
                if let Err(e) = child.kill() {
                    debug!("failed to kill process {}: {e}", child.id());
                }
                return;
            };

            signal_group(pgid, Signal::SIGTERM);
            thread::sleep(grace);
            signal_group(pgid, Signal::SIGKILL);
        }
    }

    fn signal_group(pgid: Pid, signal: Signal) {
        match killpg(pgid, signal) {
            Ok(()) => debug!("sent {signal} to process group {pgid}"),
            // Group already gone
            Err(Errno::ESRCH) => debug!("process group {pgid} already exited"),
            Err(e) => warn!("failed to send {signal} to process group {pgid}: {e}"),
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::os::windows::process::CommandExt;
    use std::process::{Child, Command};
    use std::time::Duration;

    use tracing::debug;

    use super::ProcessGroup;

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    /// Windows has no group-wide graceful signal for console processes
    /// started this way; the child is terminated directly.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WindowsProcessGroup;

    impl ProcessGroup for WindowsProcessGroup {
        fn configure(&self, cmd: &mut Command) {
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        fn terminate(&self, child: &mut Child, _grace: Duration) {
            if let Err(e) = child.kill() {
                debug!("failed to kill process {}: {e}", child.id());
            }
        }
    }
}
