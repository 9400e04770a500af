//! Real signals delivered to the `ratchet` binary
//!
//! Each run gets its own repository and `RUNNER_TEMP`, so the assertions
//! only see worktrees created by the child under test.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serial_test::serial;
use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wait_timeout::ChildExt;

use super::helpers::*;

const SLOW_METRIC: &str = "sleep 3; cat value.txt";
const EXIT_TIMEOUT: Duration = Duration::from_secs(10);

struct SignalRun {
    repo: TempDir,
    temp_root: TempDir,
    logs: TempDir,
}

impl SignalRun {
    fn new() -> Self {
        Self {
            repo: init_feature_repo("1", "2"),
            temp_root: TempDir::new().expect("Failed to create temp root"),
            logs: TempDir::new().expect("Failed to create log dir"),
        }
    }

    fn spawn(&self, args: &[&str]) -> Child {
        let stderr = File::create(self.stderr_path()).expect("Failed to create stderr log");
        Command::new(env!("CARGO_BIN_EXE_ratchet"))
            .args(args)
            .current_dir(self.repo.path())
            .env("RUNNER_TEMP", self.temp_root.path())
            .env_remove("GITHUB_BASE_REF")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn()
            .expect("Failed to spawn ratchet")
    }

    fn stderr_path(&self) -> std::path::PathBuf {
        self.logs.path().join("stderr.log")
    }

    fn stderr(&self) -> String {
        fs::read_to_string(self.stderr_path()).unwrap_or_default()
    }

    /// Block until the base worktree exists, then give the metric time to start
    fn wait_for_worktree(&self, child: &mut Child) {
        let deadline = Instant::now() + EXIT_TIMEOUT;
        while leftover_worktrees(self.temp_root.path()).is_empty() {
            if let Some(status) = child.try_wait().expect("Failed to poll ratchet") {
                panic!("ratchet exited with {status} before creating a worktree:\n{}", self.stderr());
            }
            if Instant::now() > deadline {
                let _ = child.kill();
                panic!("no worktree appeared:\n{}", self.stderr());
            }
            thread::sleep(Duration::from_millis(20));
        }
        thread::sleep(Duration::from_millis(300));
    }

    fn wait_for_exit(&self, child: &mut Child) -> ExitStatus {
        match child.wait_timeout(EXIT_TIMEOUT).expect("Failed to wait for ratchet") {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                panic!(
                    "ratchet still running {EXIT_TIMEOUT:?} after the signal:\n{}",
                    self.stderr()
                );
            }
        }
    }

    fn assert_interrupted_and_clean(&self, status: ExitStatus) {
        assert_eq!(status.code(), Some(130), "stderr:\n{}", self.stderr());
        assert!(
            leftover_worktrees(self.temp_root.path()).is_empty(),
            "worktree left behind:\n{}",
            self.stderr()
        );
        assert_eq!(registered_worktrees(self.repo.path()), 1, "stderr:\n{}", self.stderr());
    }
}

fn registered_worktrees(repo_root: &Path) -> usize {
    git(&["worktree", "list", "--porcelain"], repo_root)
        .lines()
        .filter(|line| line.starts_with("worktree "))
        .count()
}

/// Signal the child while its base metric is running
fn interrupt_during_metric(signal: Signal, debug: bool) {
    let run = SignalRun::new();
    let mut args = vec!["--gt", "main", SLOW_METRIC];
    if debug {
        args.insert(0, "--debug");
    }

    let mut child = run.spawn(&args);
    run.wait_for_worktree(&mut child);
    kill(Pid::from_raw(child.id() as i32), signal).expect("Failed to signal ratchet");

    let status = run.wait_for_exit(&mut child);
    run.assert_interrupted_and_clean(status);
}

/// The pre command signals ratchet as it finishes, so the signal lands in
/// the gap between the pre and metric commands
fn interrupt_between_commands(debug: bool) {
    let run = SignalRun::new();
    let mut args = vec!["--pre", "kill -INT $PPID", "--gt", "main", SLOW_METRIC];
    if debug {
        args.insert(0, "--debug");
    }

    let mut child = run.spawn(&args);
    let status = run.wait_for_exit(&mut child);
    run.assert_interrupted_and_clean(status);
}

#[test]
#[serial]
fn test_sigint_during_metric_with_debug_logging() {
    interrupt_during_metric(Signal::SIGINT, true);
}

#[test]
#[serial]
fn test_sigint_during_metric() {
    interrupt_during_metric(Signal::SIGINT, false);
}

#[test]
#[serial]
fn test_sigterm_during_metric_with_debug_logging() {
    interrupt_during_metric(Signal::SIGTERM, true);
}

#[test]
#[serial]
fn test_sigterm_during_metric() {
    interrupt_during_metric(Signal::SIGTERM, false);
}

#[test]
#[serial]
fn test_sigint_between_commands_with_debug_logging() {
    interrupt_between_commands(true);
}

#[test]
#[serial]
fn test_sigint_between_commands() {
    interrupt_between_commands(false);
}
