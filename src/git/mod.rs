//! Git operations for the base-branch checkout
//!
//! This module provides:
//! - Branch resolution, fetching from `origin` when the base is not local
//! - Temporary worktree creation and idempotent removal
//! - A sweep for worktrees orphaned by killed runs

pub mod branch;
pub mod cleanup;
mod error;
pub mod runner;
pub mod worktree;

pub use branch::{current_branch, ensure_branch, is_git_repository, ref_exists, HEAD_LABEL};
pub use cleanup::{cleanup_orphans, CleanupConfig, CleanupResult};
pub use error::GitError;
pub use worktree::{ReleaseHandle, Worktree, WorktreeManager};
