//! Git command runner
//!
//! Centralized helpers for invoking `git` with consistent error context.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// Run a git command in `repo_root` and return the raw Output.
///
/// Use this when both stdout and stderr are needed, or when a non-zero exit
/// is an expected outcome the caller wants to inspect.
pub fn run_git(args: &[&str], repo_root: &Path) -> Result<Output> {
    debug!("git {}", args.join(" "));
    Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .with_context(|| format!("Failed to execute: git {}", args.join(" ")))
}

/// Run a git command, check for success, and return trimmed stdout.
///
/// On failure, bails with the trimmed stderr content.
pub fn run_git_checked(args: &[&str], repo_root: &Path) -> Result<String> {
    let output = run_git(args, repo_root)?;
    if !output.status.success() {
        let cmd = args.first().unwrap_or(&"");
        bail!("git {cmd} failed: {}", combined_output(&output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a git command and return true if exit code is 0.
///
/// Spawn failures count as `false`. Use for checks like `rev-parse --verify`.
pub fn run_git_bool(args: &[&str], repo_root: &Path) -> bool {
    run_git(args, repo_root)
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Trimmed stderr followed by trimmed stdout, for diagnostics.
///
/// git reports some failures (notably `worktree add` conflicts) on either
/// stream depending on version.
pub fn combined_output(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parts: Vec<&str> = [stderr.trim(), stdout.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    parts.join("\n")
}
