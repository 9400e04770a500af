//! Temporary git worktrees for the base branch
//!
//! The base state is evaluated in its own worktree under the temp directory
//! so the caller's checkout is never touched.
//!
//! ## Module structure
//!
//! - `operations`: `WorktreeManager` (branch resolution, creation)
//! - `paths`: temp-root selection and collision-resistant naming
//! - `release`: idempotent teardown handle

mod operations;
mod paths;
mod release;

pub use operations::{Worktree, WorktreeManager, CI_BASE_REF_ENV};
pub use paths::{
    default_temp_root, owner_pid, unique_worktree_path, worktree_glob, TEMP_DIR_ENV,
    WORKTREE_PREFIX,
};
pub use release::ReleaseHandle;
