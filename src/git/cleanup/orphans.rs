//! Sweep of worktrees left behind by abnormally terminated runs

use anyhow::{Context, Result};
use glob::glob;
use std::path::Path;
use tracing::debug;

use crate::git::runner::{combined_output, run_git};
use crate::git::worktree::{owner_pid, worktree_glob};
use crate::process::is_process_alive;

use super::config::{CleanupConfig, CleanupResult};

/// Remove every `ratchet-worktree-*` directory under `temp_root`.
///
/// Each match is first unregistered with `git worktree remove --force` run
/// from `repo_root`; if git refuses (wrong repository, already unregistered)
/// the directory is removed directly. Failures are collected in the result
/// and do not stop the sweep.
pub fn cleanup_orphans(
    repo_root: &Path,
    temp_root: &Path,
    config: &CleanupConfig,
) -> Result<CleanupResult> {
    let pattern = worktree_glob(temp_root);
    let matches = glob(&pattern)
        .with_context(|| format!("Failed to search for orphaned worktrees: {pattern}"))?;

    let mut result = CleanupResult::default();

    for entry in matches {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                result.errors.push(format!("failed to read {}: {e}", e.path().display()));
                continue;
            }
        };

        if config.skip_live_owners && owned_by_live_process(&path) {
            debug!("skipping {} owned by a running process", path.display());
            result.skipped.push(path);
            continue;
        }

        match remove_orphan(&path, repo_root) {
            Ok(()) => result.cleaned.push(path),
            Err(e) => result
                .errors
                .push(format!("failed to remove {}: {e}", path.display())),
        }
    }

    if config.prune_worktrees && !result.cleaned.is_empty() {
        if let Ok(output) = run_git(&["worktree", "prune"], repo_root) {
            if !output.status.success() {
                debug!("git worktree prune failed: {}", combined_output(&output));
            }
        }
    }

    Ok(result)
}

fn owned_by_live_process(path: &Path) -> bool {
    owner_pid(path).is_some_and(|pid| pid != std::process::id() && is_process_alive(pid))
}

fn remove_orphan(path: &Path, repo_root: &Path) -> std::io::Result<()> {
    let path_str = path.to_string_lossy();
    let git_removed = run_git(&["worktree", "remove", "--force", &path_str], repo_root)
        .map(|output| output.status.success())
        .unwrap_or(false);

    if git_removed && !path.exists() {
        debug!("git removed orphaned worktree {}", path.display());
        return Ok(());
    }

    std::fs::remove_dir_all(path)
}
