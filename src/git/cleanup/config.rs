//! Configuration and result types for orphan cleanup

use std::path::PathBuf;

/// Configuration for an orphan sweep
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Leave worktrees whose creating process is still running
    pub skip_live_owners: bool,
    /// Run `git worktree prune` after the sweep
    pub prune_worktrees: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            skip_live_owners: false,
            prune_worktrees: true,
        }
    }
}

impl CleanupConfig {
    /// Sweep that spares worktrees of concurrently running ratchet processes
    pub fn sparing_live_runs() -> Self {
        Self {
            skip_live_owners: true,
            ..Self::default()
        }
    }
}

/// Outcome of an orphan sweep
#[derive(Debug, Clone, Default)]
pub struct CleanupResult {
    /// Worktrees that were removed
    pub cleaned: Vec<PathBuf>,
    /// Worktrees left alone because their owner is alive
    pub skipped: Vec<PathBuf>,
    /// Per-path failures (non-fatal to the sweep)
    pub errors: Vec<String>,
}

impl CleanupResult {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
