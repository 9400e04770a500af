//! Base-branch worktree creation

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::git::branch::{ensure_branch, ref_exists, remote_ref};
use crate::git::error::GitError;
use crate::git::runner::{combined_output, run_git};
use crate::process::CancellationToken;

use super::paths::{default_temp_root, unique_worktree_path};
use super::release::ReleaseHandle;

/// CI-provided name of the pull request's target branch (GitHub Actions)
pub const CI_BASE_REF_ENV: &str = "GITHUB_BASE_REF";

/// Messages git uses when the branch is checked out in another worktree
const ALREADY_CHECKED_OUT: [&str; 2] = ["is already used by worktree", "is already checked out"];

/// Materializes temporary checkouts of a base branch next to the caller's
/// repository.
#[derive(Debug, Clone)]
pub struct WorktreeManager {
    repo_root: PathBuf,
    temp_root: PathBuf,
    ci_base_ref: Option<String>,
}

/// A checked-out base worktree, removed when dropped.
#[derive(Debug)]
pub struct Worktree {
    path: PathBuf,
    reference: String,
    detached: bool,
    release: ReleaseHandle,
}

impl Worktree {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reference the worktree was created from
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// True when the branch was busy elsewhere and the commit was checked
    /// out detached instead
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn release_handle(&self) -> ReleaseHandle {
        self.release.clone()
    }
}

impl Drop for Worktree {
    fn drop(&mut self) {
        self.release.release();
    }
}

impl WorktreeManager {
    /// Manager for `repo_root`, configured from the environment
    /// (`RUNNER_TEMP`, `GITHUB_BASE_REF`).
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let ci_base_ref = std::env::var(CI_BASE_REF_ENV)
            .ok()
            .filter(|value| !value.is_empty());
        Self {
            repo_root: repo_root.into(),
            temp_root: default_temp_root(),
            ci_base_ref,
        }
    }

    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    pub fn with_ci_base_ref(mut self, ci_base_ref: Option<String>) -> Self {
        self.ci_base_ref = ci_base_ref.filter(|value| !value.is_empty());
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Confirm `branch` exists locally or on `origin`, fetching if needed.
    ///
    /// Returns the reference a worktree should be created from.
    pub fn ensure_branch(&self, branch: &str) -> Result<String, GitError> {
        ensure_branch(branch, self.ci_base_ref.as_deref(), &self.repo_root)
    }

    /// Create a worktree for `branch` at a fresh temporary path.
    pub fn create_worktree(
        &self,
        branch: &str,
        cancel: &CancellationToken,
    ) -> Result<Worktree, GitError> {
        self.create_worktree_with(branch, cancel, |_| {})
    }

    /// Like [`Self::create_worktree`], but hands the release handle to
    /// `on_reserved` before git touches the filesystem, so an interrupt that
    /// arrives mid-creation can still clean up the half-made directory.
    pub fn create_worktree_with(
        &self,
        branch: &str,
        cancel: &CancellationToken,
        on_reserved: impl FnOnce(ReleaseHandle),
    ) -> Result<Worktree, GitError> {
        if cancel.is_cancelled() {
            return Err(GitError::Interrupted);
        }

        let path = unique_worktree_path(&self.temp_root);
        let release = ReleaseHandle::new(path.clone(), self.repo_root.clone());
        on_reserved(release.clone());

        let reference = self.checkout_ref(branch);
        match self.add_worktree(&path, &reference) {
            Ok(detached) => {
                debug!(
                    "created worktree {} at {reference}{}",
                    path.display(),
                    if detached { " (detached)" } else { "" }
                );
                Ok(Worktree {
                    path,
                    reference,
                    detached,
                    release,
                })
            }
            Err(e) => {
                release.release();
                Err(e)
            }
        }
    }

    /// Prefer the local name, fall back to the remote-tracking ref.
    fn checkout_ref(&self, branch: &str) -> String {
        if branch.starts_with("origin/") || ref_exists(branch, &self.repo_root) {
            branch.to_string()
        } else {
            remote_ref(branch)
        }
    }

    /// Returns whether the fallback detached checkout was used.
    fn add_worktree(&self, path: &Path, reference: &str) -> Result<bool, GitError> {
        let path_str = path.to_string_lossy();

        let output = run_git(&["worktree", "add", &path_str, reference], &self.repo_root)?;
        if output.status.success() {
            return Ok(false);
        }

        let detail = combined_output(&output);
        if !ALREADY_CHECKED_OUT.iter().any(|msg| detail.contains(msg)) {
            return Err(GitError::WorktreeCreationFailed {
                branch: reference.to_string(),
                detail,
            });
        }

        debug!("{reference} is checked out elsewhere, retrying detached");
        let output = run_git(
            &["worktree", "add", "--detach", &path_str, reference],
            &self.repo_root,
        )?;
        if !output.status.success() {
            return Err(GitError::WorktreeCreationFailed {
                branch: reference.to_string(),
                detail: combined_output(&output),
            });
        }
        Ok(true)
    }
}
