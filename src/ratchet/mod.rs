//! The ratchet check itself
//!
//! A run evaluates an optional `pre` command, the `metric` command and an
//! optional `post` command in a temporary worktree of the base branch, then
//! the same commands in the caller's checkout, and compares the two metric
//! values. Without a comparison only the current value is printed.
//!
//! ## Module structure
//!
//! - `options`: comparison operators and the immutable run options
//! - `engine`: the per-state stage machine and verdict
//! - `outcome`: run results and failure reasons
//! - `progress`: verbose progress-line rendering

mod engine;
mod options;
mod outcome;
mod progress;

use std::io;

use anyhow::Context;

use crate::error::{RatchetError, Result};
use crate::interrupt::InterruptCoordinator;

pub use engine::Ratchet;
pub use options::{BaseComparison, Comparison, Options};
pub use outcome::{FailureReason, RunOutcome, Stage};
pub use progress::{render_line, StageFlags};

/// Run a ratchet check in the current directory against the process's
/// stdout and stderr, with SIGINT/SIGTERM wired to worktree cleanup.
///
/// Every failed evaluation returns [`RatchetError::MetricTestFailed`] after
/// its diagnostic has been written to stderr.
pub fn run(options: Options) -> Result<()> {
    let repo_root = std::env::current_dir().context("Failed to get current directory")?;
    let interrupts = InterruptCoordinator::install()?;

    let ratchet = Ratchet::new(options, repo_root);
    // Unlocked handles: the interrupt handler logs to stderr while this
    // thread may be blocked on worktree release.
    let outcome = ratchet.run(&interrupts, &mut io::stdout(), &mut io::stderr())?;

    match outcome {
        RunOutcome::Failed(_) => Err(RatchetError::MetricTestFailed),
        RunOutcome::Reported(_) | RunOutcome::Passed { .. } => Ok(()),
    }
}
