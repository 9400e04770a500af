//! End-to-end runs: report mode, comparisons, and every failure path

use serial_test::serial;
use std::fs;
use tempfile::TempDir;

use ratchet::ratchet::{FailureReason, Stage};
use ratchet::{Comparison, Options, RatchetError, RunOutcome};

use super::helpers::*;

#[test]
#[serial]
fn test_report_only_prints_value_without_worktree() {
    let repo = init_test_repo("7");
    let temp_root = TempDir::new().unwrap();

    let run = run_ratchet(Options::new("echo 42"), repo.path(), temp_root.path());

    assert_eq!(run.outcome(), &RunOutcome::Reported(42.0));
    assert_eq!(run.stdout, "42\n");
    assert!(run.stderr.is_empty());
    assert!(leftover_worktrees(temp_root.path()).is_empty());
    assert_eq!(git(&["worktree", "list", "--porcelain"], repo.path()).matches("worktree ").count(), 1);
}

#[test]
#[serial]
fn test_report_only_never_resolves_base() {
    let repo = init_test_repo("7");
    let temp_root = TempDir::new().unwrap();

    // No comparison: a missing base ref in the options is irrelevant
    let run = run_ratchet(Options::new(METRIC).verbose(true), repo.path(), temp_root.path());

    assert_eq!(run.outcome(), &RunOutcome::Reported(7.0));
    assert_eq!(run.stdout, "7\n");
}

#[test]
#[serial]
fn test_greater_than_passes() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC).compare_to(Comparison::GreaterThan, "main");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Passed {
            current: 5.0,
            base: 3.0
        }
    );
    assert_eq!(run.stdout, "Succeeded\n");
    assert!(leftover_worktrees(temp_root.path()).is_empty());
}

#[test]
#[serial]
fn test_greater_than_fails() {
    let repo = init_feature_repo("5", "3");
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC).compare_to(Comparison::GreaterThan, "main");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Failed(FailureReason::ComparisonNotSatisfied {
            current: 3.0,
            base: 5.0
        })
    );
    assert!(run.stderr.contains("feature metric (3) is NOT greater than main (5)"));
    assert!(run.stderr.ends_with("Failed\n"));
    assert!(!run.stdout.contains("Succeeded"));
    assert!(leftover_worktrees(temp_root.path()).is_empty());
}

#[test]
#[serial]
fn test_equality_boundaries() {
    let repo = init_feature_repo("4", "4");
    let temp_root = TempDir::new().unwrap();

    for (comparison, passes) in [
        (Comparison::LessThan, false),
        (Comparison::LessEqual, true),
        (Comparison::Equal, true),
        (Comparison::GreaterEqual, true),
        (Comparison::GreaterThan, false),
    ] {
        let options = Options::new(METRIC).compare_to(comparison, "main");
        let run = run_ratchet(options, repo.path(), temp_root.path());
        assert_eq!(run.outcome().is_success(), passes, "{comparison} on equal values");
    }
}

#[test]
#[serial]
fn test_fractional_values_compare() {
    let repo = init_feature_repo("2.5", "2.25");
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC)
        .compare_to(Comparison::LessThan, "main")
        .verbose(true);
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert!(run.outcome().is_success());
    assert!(run.stdout.contains("feature metric (2.25) is less than main (2.5)"));
}

#[test]
#[serial]
fn test_verbose_progress_layout() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC)
        .with_pre("true")
        .compare_to(Comparison::GreaterThan, "main")
        .verbose(true);
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert!(run.outcome().is_success());
    let expected = concat!(
        "main: pre [ ] ; metric [ ]",
        "\rmain: pre [x] ; metric [ ]",
        "\rmain: pre [x] ; metric [x]\n",
        "HEAD: pre [ ] ; metric [ ]",
        "\rHEAD: pre [x] ; metric [ ]",
        "\rHEAD: pre [x] ; metric [x]\n",
        "\nfeature metric (5) is greater than main (3)\n",
        "Succeeded\n",
    );
    assert_eq!(run.stdout, expected);
}

#[test]
#[serial]
fn test_base_metric_failure_skips_current() {
    let repo = init_test_repo("3");
    create_branch_with_file("feature", "ok.txt", "5\n", repo.path());
    let temp_root = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    let log = log_dir.path().join("pre.log");

    // ok.txt only exists on feature, so the metric fails on main
    let options = Options::new("cat ok.txt")
        .with_pre(format!("pwd >> '{}'", log.display()))
        .compare_to(Comparison::GreaterThan, "main")
        .verbose(true);
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Failed(FailureReason::CommandFailed {
            stage: Stage::Metric,
            branch: "main".into()
        })
    );
    assert!(run.stderr.contains("Metric command 'cat ok.txt' failed in main"));
    assert!(run.stderr.contains("  stderr: "));
    assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 1, "current pre must not run");
    assert!(run.stdout.ends_with("\rmain: pre [x] ; metric [ ]\nHEAD: pre [ ] ; metric [ ]\n\n"));
    assert!(leftover_worktrees(temp_root.path()).is_empty());
}

#[test]
#[serial]
fn test_current_pre_failure() {
    let repo = init_test_repo("3");
    create_branch_with_file("feature", "broken", "", repo.path());
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC)
        .with_pre("test ! -f broken")
        .compare_to(Comparison::GreaterEqual, "main");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Failed(FailureReason::CommandFailed {
            stage: Stage::Pre,
            branch: "feature".into()
        })
    );
    assert!(run.stderr.contains("Command 'test ! -f broken' failed in feature"));
    assert!(run.stdout.is_empty());
}

#[test]
#[serial]
fn test_post_failure() {
    let repo = init_feature_repo("3", "3");
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC)
        .with_post("exit 4")
        .compare_to(Comparison::Equal, "main");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Failed(FailureReason::CommandFailed {
            stage: Stage::Post,
            branch: "main".into()
        })
    );
    assert!(run.stderr.contains("Command 'exit 4' failed in main"));
}

#[test]
#[serial]
fn test_non_numeric_base_output() {
    let repo = init_feature_repo("N/A", "5");
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC).compare_to(Comparison::LessThan, "main");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Failed(FailureReason::NonNumericOutput {
            branch: "main".into(),
            output: "N/A".into()
        })
    );
    assert!(run.stderr.contains("Command output from main is not a number: 'N/A'"));
}

#[test]
#[serial]
fn test_non_numeric_current_output() {
    let repo = init_feature_repo("5", "abc");
    let temp_root = TempDir::new().unwrap();

    let options = Options::new(METRIC).compare_to(Comparison::LessThan, "main");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Failed(FailureReason::NonNumericOutput {
            branch: "feature".into(),
            output: "abc".into()
        })
    );
    assert!(run.stderr.contains("'abc'"));
}

#[test]
#[serial]
fn test_empty_output_is_not_a_number() {
    let repo = init_test_repo("1");
    let temp_root = TempDir::new().unwrap();

    let run = run_ratchet(Options::new("true"), repo.path(), temp_root.path());

    assert!(matches!(
        run.outcome(),
        RunOutcome::Failed(FailureReason::NonNumericOutput { output, .. }) if output.is_empty()
    ));
    assert!(run.stderr.contains("is not a number: ''"));
    assert!(run.stdout.is_empty());
}

#[test]
#[serial]
fn test_unknown_base_runs_no_command() {
    let repo = init_test_repo("1");
    let temp_root = TempDir::new().unwrap();
    let marker = repo.path().join("ran");

    let options = Options::new(format!("touch '{}'; echo 1", marker.display()))
        .compare_to(Comparison::Equal, "no-such-branch");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Failed(FailureReason::BranchNotFound {
            branch: "no-such-branch".into()
        })
    );
    assert!(run.stderr.contains("Base branch 'no-such-branch' not found"));
    assert!(!marker.exists());
    assert!(leftover_worktrees(temp_root.path()).is_empty());
}

#[test]
#[serial]
fn test_base_is_checked_out_branch() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();

    // feature is the caller's checkout, so the base worktree is detached
    let options = Options::new(METRIC).compare_to(Comparison::Equal, "feature");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Passed {
            current: 5.0,
            base: 5.0
        }
    );
    assert!(leftover_worktrees(temp_root.path()).is_empty());
}

#[test]
#[serial]
fn test_commands_run_in_their_own_checkout() {
    let repo = init_feature_repo("3", "5");
    let temp_root = TempDir::new().unwrap();

    // Uncommitted edits in the caller's checkout count for current only
    fs::write(repo.path().join("value.txt"), "9\n").unwrap();

    let options = Options::new(METRIC).compare_to(Comparison::GreaterThan, "main");
    let run = run_ratchet(options, repo.path(), temp_root.path());

    assert_eq!(
        run.outcome(),
        &RunOutcome::Passed {
            current: 9.0,
            base: 3.0
        }
    );
}

#[test]
fn test_not_a_git_repository() {
    let dir = TempDir::new().unwrap();
    let temp_root = TempDir::new().unwrap();

    let run = run_ratchet(Options::new("echo 1"), dir.path(), temp_root.path());

    assert!(matches!(run.result, Err(RatchetError::NotAGitRepository)));
    assert_eq!(RatchetError::NotAGitRepository.exit_code(), 2);
}
