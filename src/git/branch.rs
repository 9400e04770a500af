//! Branch resolution for the base checkout

use std::path::Path;

use tracing::debug;

use super::error::GitError;
use super::runner::{combined_output, run_git, run_git_bool, run_git_checked};

/// Remote consulted when a base branch is not available locally
pub const REMOTE: &str = "origin";

/// Display name for the current checkout when no branch name resolves
pub const HEAD_LABEL: &str = "HEAD";

/// Check whether `dir` is inside a git repository
pub fn is_git_repository(dir: &Path) -> bool {
    run_git_bool(&["rev-parse", "--git-dir"], dir)
}

/// Name of the checked-out branch, `HEAD` when detached or unresolvable
pub fn current_branch(repo_root: &Path) -> String {
    run_git_checked(&["rev-parse", "--abbrev-ref", "HEAD"], repo_root)
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| HEAD_LABEL.to_string())
}

/// Check whether `reference` resolves to an object
pub fn ref_exists(reference: &str, repo_root: &Path) -> bool {
    run_git_bool(&["rev-parse", "--verify", "--quiet", reference], repo_root)
}

/// `origin/<branch>`, leaving an already-qualified name alone
pub fn remote_ref(branch: &str) -> String {
    if branch.starts_with("origin/") {
        branch.to_string()
    } else {
        format!("{REMOTE}/{branch}")
    }
}

/// Make sure `branch` can be checked out, fetching it when necessary.
///
/// Returns the reference to check out: `branch` itself when it resolves
/// locally, otherwise the fetched `origin/<name>`. When `ci_base_ref` is set
/// and the requested branch is literally `main`, the CI-provided name is
/// fetched instead so pull-request targets other than `main` are respected.
pub fn ensure_branch(
    branch: &str,
    ci_base_ref: Option<&str>,
    repo_root: &Path,
) -> Result<String, GitError> {
    if ref_exists(branch, repo_root) {
        return Ok(branch.to_string());
    }

    let branch = match ci_base_ref {
        Some(ci_ref) if branch == "main" && !ci_ref.is_empty() => {
            debug!("using CI base ref '{ci_ref}' in place of 'main'");
            ci_ref
        }
        _ => branch,
    };

    let remote_branch = remote_ref(branch);
    let fetch_name = remote_branch
        .strip_prefix("origin/")
        .unwrap_or(&remote_branch);

    let output = run_git(&["fetch", REMOTE, fetch_name], repo_root)?;
    if !output.status.success() {
        return Err(GitError::BranchNotFound {
            branch: branch.to_string(),
            detail: combined_output(&output),
        });
    }

    if !ref_exists(&remote_branch, repo_root) {
        return Err(GitError::BranchNotFound {
            branch: branch.to_string(),
            detail: format!("{remote_branch} does not resolve after fetch"),
        });
    }

    Ok(remote_branch)
}
