use anyhow::{anyhow, Context};
use colored::Colorize;
use ratchet::config::Config;
use ratchet::error::{RatchetError, Result};
use ratchet::git::worktree::default_temp_root;
use ratchet::git::{cleanup_orphans, is_git_repository, CleanupConfig};

use super::types::{CheckArgs, Cli, Commands};

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Cleanup { skip_active }) => cleanup(skip_active),
        None => check(&cli.check),
    }
}

/// Build options from config and flags, then run the check.
fn check(args: &CheckArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let mut config = match (&args.config, &args.config_string) {
        (Some(path), _) => Config::load_from_file(path)?,
        (None, Some(text)) => Config::load_from_str(text)?,
        (None, None) => Config::load_default(&cwd)?,
    };
    config.merge_flags(&args.overrides());

    ratchet::run(config.into_options()?)
}

fn cleanup(skip_active: bool) -> Result<()> {
    let repo_root = std::env::current_dir().context("Failed to get current directory")?;
    if !is_git_repository(&repo_root) {
        return Err(RatchetError::NotAGitRepository);
    }

    let config = if skip_active {
        CleanupConfig::sparing_live_runs()
    } else {
        CleanupConfig::default()
    };
    let result = cleanup_orphans(&repo_root, &default_temp_root(), &config)?;

    if result.cleaned.is_empty() {
        println!("No orphaned worktrees found");
    } else {
        println!("Cleaned up {} orphaned worktrees:", result.cleaned.len());
        for path in &result.cleaned {
            println!("  - {}", path.display());
        }
    }
    if !result.skipped.is_empty() {
        println!(
            "{} {} worktrees of running ratchet processes",
            "Skipped".yellow(),
            result.skipped.len()
        );
    }

    if !result.is_complete() {
        return Err(anyhow!("cleanup errors:\n{}", result.errors.join("\n")).into());
    }
    Ok(())
}
