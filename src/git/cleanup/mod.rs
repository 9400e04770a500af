//! Cleanup of worktrees orphaned by earlier runs
//!
//! A run that is killed without a chance to run its handlers (SIGKILL, a
//! crashed CI runner) leaves its `ratchet-worktree-*` directory behind. This
//! is a maintenance sweep, independent of any single run.

mod config;
mod orphans;


pub use config::{CleanupConfig, CleanupResult};
pub use orphans::cleanup_orphans;
