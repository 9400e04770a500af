//! Worktree creation, detached fallback, release and interrupt cleanup

use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use ratchet::git::GitError;
use ratchet::interrupt::InterruptCoordinator;
use ratchet::process::CancellationToken;

use super::helpers::*;

fn registered_worktrees(repo_root: &Path) -> String {
    git(&["worktree", "list", "--porcelain"], repo_root)
}

#[test]
#[serial]
fn test_worktree_checks_out_base_content() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(repo.path(), temp_root.path());

    let worktree = manager
        .create_worktree("main", &CancellationToken::new())
        .expect("Failed to create worktree");

    assert!(!worktree.is_detached());
    assert_eq!(worktree.reference(), "main");
    assert!(worktree.path().starts_with(temp_root.path()));
    assert_eq!(fs::read_to_string(worktree.path().join("value.txt")).unwrap(), "3\n");
    // The caller's checkout is untouched
    assert_eq!(fs::read_to_string(repo.path().join("value.txt")).unwrap(), "5\n");

    let path = worktree.path().to_path_buf();
    drop(worktree);
    assert!(!path.exists());
    assert!(!registered_worktrees(repo.path()).contains(&*path.to_string_lossy()));
}

#[test]
#[serial]
fn test_checked_out_branch_falls_back_to_detached() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(repo.path(), temp_root.path());

    let worktree = manager
        .create_worktree("feature", &CancellationToken::new())
        .expect("Failed to create detached worktree");

    assert!(worktree.is_detached());
    assert_eq!(fs::read_to_string(worktree.path().join("value.txt")).unwrap(), "5\n");
}

#[test]
#[serial]
fn test_release_is_idempotent() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(repo.path(), temp_root.path());

    let worktree = manager.create_worktree("main", &CancellationToken::new()).unwrap();
    let handle = worktree.release_handle();
    let path = worktree.path().to_path_buf();

    assert!(handle.release());
    assert!(!path.exists());
    assert!(!handle.release());
    drop(worktree);

    assert!(leftover_worktrees(temp_root.path()).is_empty());
    assert_eq!(registered_worktrees(repo.path()).matches("worktree ").count(), 1);
}

#[test]
#[serial]
fn test_cancelled_token_creates_nothing() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(repo.path(), temp_root.path());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = manager.create_worktree("main", &cancel);
    assert!(matches!(result, Err(GitError::Interrupted)));
    assert!(leftover_worktrees(temp_root.path()).is_empty());
}

#[test]
#[serial]
fn test_failed_creation_releases_reserved_path() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(repo.path(), temp_root.path());

    let mut reserved = None;
    let result = manager.create_worktree_with("no-such-branch", &CancellationToken::new(), |handle| {
        reserved = Some(handle)
    });

    assert!(matches!(result, Err(GitError::WorktreeCreationFailed { .. })));
    let reserved = reserved.expect("handle is handed out before git runs");
    assert!(reserved.is_released());
    assert!(!reserved.path().exists());
}

#[test]
#[serial]
fn test_interrupt_releases_registered_worktree() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(repo.path(), temp_root.path());
    let interrupts = InterruptCoordinator::new();

    let worktree = manager
        .create_worktree_with("main", &interrupts.token(), |handle| {
            interrupts.register_cleanup(handle)
        })
        .unwrap();
    let path = worktree.path().to_path_buf();
    assert!(path.exists());

    assert!(interrupts.interrupt());
    assert!(!path.exists());
    assert!(interrupts.token().is_cancelled());

    // The deferred release after the handler ran has nothing left to do
    assert!(!worktree.release_handle().release());
    drop(worktree);
    assert_eq!(registered_worktrees(repo.path()).matches("worktree ").count(), 1);
}

#[test]
#[serial]
fn test_ensure_branch_prefers_local() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(repo.path(), temp_root.path());

    assert_eq!(manager.ensure_branch("main").unwrap(), "main");
    assert!(matches!(
        manager.ensure_branch("missing"),
        Err(GitError::BranchNotFound { .. })
    ));
}

/// Upstream with `main`, `develop` and `release`, cloned so that only
/// `develop` exists locally.
fn clone_with_remote_branches() -> (TempDir, TempDir) {
    let upstream = init_test_repo("1");
    create_branch_with_file("release", "value.txt", "2\n", upstream.path());
    create_branch_with_file("develop", "value.txt", "3\n", upstream.path());

    let clone_parent = TempDir::new().unwrap();
    git(
        &[
            "clone",
            "--branch",
            "develop",
            &upstream.path().to_string_lossy(),
            "clone",
        ],
        clone_parent.path(),
    );
    (upstream, clone_parent)
}

#[test]
#[serial]
fn test_missing_base_is_fetched_from_origin() {
    let (_upstream, clone_parent) = clone_with_remote_branches();
    let clone = clone_parent.path().join("clone");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(&clone, temp_root.path());

    let reference = manager.ensure_branch("main").unwrap();
    assert_eq!(reference, "origin/main");

    let worktree = manager.create_worktree(&reference, &CancellationToken::new()).unwrap();
    assert_eq!(fs::read_to_string(worktree.path().join("value.txt")).unwrap(), "1\n");
}

#[test]
#[serial]
fn test_ci_base_ref_replaces_main() {
    let (_upstream, clone_parent) = clone_with_remote_branches();
    let clone = clone_parent.path().join("clone");
    let temp_root = TempDir::new().unwrap();
    let manager = worktree_manager(&clone, temp_root.path()).with_ci_base_ref(Some("release".into()));

    assert_eq!(manager.ensure_branch("main").unwrap(), "origin/release");
    // Only the literal name `main` is redirected
    assert_eq!(manager.ensure_branch("develop").unwrap(), "develop");
}
