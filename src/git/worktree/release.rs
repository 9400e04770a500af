//! Idempotent worktree teardown

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::git::runner::{combined_output, run_git};

/// Removes one worktree, at most once.
///
/// Clones share state, so the interrupt handler and the normal deferred path
/// can both hold a handle. Whichever calls [`ReleaseHandle::release`] first
/// does the removal; a concurrent caller waits until it finishes and then
/// has nothing left to do. The state lock is never held while git runs or
/// while anything is logged.
#[derive(Debug, Clone)]
pub struct ReleaseHandle {
    inner: Arc<ReleaseState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Pending,
    Releasing,
    Released,
}

#[derive(Debug)]
struct ReleaseState {
    path: PathBuf,
    repo_root: PathBuf,
    progress: Mutex<Progress>,
    finished: Condvar,
}

impl ReleaseHandle {
    pub fn new(path: PathBuf, repo_root: PathBuf) -> Self {
        Self {
            inner: Arc::new(ReleaseState {
                path,
                repo_root,
                progress: Mutex::new(Progress::Pending),
                finished: Condvar::new(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn is_released(&self) -> bool {
        *self
            .inner
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == Progress::Released
    }

    /// Remove the worktree. Failures are logged, never returned.
    ///
    /// Returns `true` when this call performed the removal. Later calls only
    /// retry the filesystem removal if the directory somehow survived.
    pub fn release(&self) -> bool {
        let claimed = {
            let mut progress = self
                .inner
                .progress
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            while *progress == Progress::Releasing {
                progress = self
                    .inner
                    .finished
                    .wait(progress)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            let claimed = *progress == Progress::Pending;
            if claimed {
                *progress = Progress::Releasing;
            }
            claimed
        };

        if !claimed {
            if self.inner.path.exists() {
                remove_dir(&self.inner.path);
            }
            return false;
        }

        remove_worktree(&self.inner.path, &self.inner.repo_root);

        *self
            .inner
            .progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Progress::Released;
        self.inner.finished.notify_all();
        true
    }
}

/// `git worktree remove --force`, then unconditional directory removal.
///
/// When git could not unregister the worktree the stale administrative
/// entry is pruned once the directory is gone.
fn remove_worktree(path: &Path, repo_root: &Path) -> bool {
    let mut git_removed = false;

    if path.exists() {
        let path_str = path.to_string_lossy();
        match run_git(&["worktree", "remove", "--force", &path_str], repo_root) {
            Ok(output) if output.status.success() => {
                debug!("removed worktree {}", path.display());
                git_removed = true;
            }
            Ok(output) => warn!(
                "failed to remove git worktree {}: {}",
                path.display(),
                combined_output(&output)
            ),
            Err(e) => warn!("failed to remove git worktree {}: {e:#}", path.display()),
        }
    }

    let dir_removed = remove_dir(path);

    if !git_removed {
        prune(repo_root);
    }

    git_removed || dir_removed
}

fn remove_dir(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }
    match std::fs::remove_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to remove worktree directory {}: {e}", path.display());
            false
        }
    }
}

fn prune(repo_root: &Path) {
    match run_git(&["worktree", "prune"], repo_root) {
        Ok(output) if output.status.success() => {}
        Ok(output) => debug!("git worktree prune failed: {}", combined_output(&output)),
        Err(e) => debug!("git worktree prune failed: {e:#}"),
    }
}
