//! Run orchestration: evaluate the base state, then the current state,
//! then compare.

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use colored::{Color, Colorize};
use tracing::debug;

use crate::error::{RatchetError, Result};
use crate::git::{current_branch, is_git_repository, GitError, Worktree, WorktreeManager, HEAD_LABEL};
use crate::interrupt::InterruptCoordinator;
use crate::parser::{format_number, parse_number};
use crate::process::{CancellationToken, CommandError, CommandExecutor};

use super::options::{BaseComparison, Options};
use super::outcome::{FailureReason, RunOutcome, Stage};
use super::progress::{render_line, StageFlags};

/// Where one code state is evaluated and how it is named.
#[derive(Debug, Clone, Copy)]
struct CodeState<'a> {
    /// Label on the progress line (`HEAD` for the current state)
    progress_label: &'a str,
    /// Name used in diagnostics and the verdict
    display_name: &'a str,
    dir: &'a Path,
}

/// Position of one code state in its pre/metric/post sequence.
#[derive(Debug)]
enum Phase {
    NotStarted,
    Running(Stage),
    Done(Stage),
    Failed(Stage, String, CommandError),
    Complete,
}

/// How a code state ended.
#[derive(Debug)]
enum StateResult {
    Complete { metric_output: String },
    Failed { stage: Stage },
}

/// Redraws a single progress line per code state.
///
/// Disabled entirely unless the run is verbose and compares against a base.
struct ProgressView<'a> {
    enabled: bool,
    base_ref: &'a str,
    present: StageFlags,
}

impl ProgressView<'_> {
    fn line(&self, label: &str, done: StageFlags) -> String {
        render_line(label, self.base_ref, self.present, done)
    }

    fn start<W: Write>(&self, out: &mut W, label: &str) -> Result<()> {
        if self.enabled {
            write!(out, "{}", self.line(label, StageFlags::NONE))?;
            out.flush()?;
        }
        Ok(())
    }

    fn redraw<W: Write>(&self, out: &mut W, label: &str, done: StageFlags) -> Result<()> {
        if self.enabled {
            write!(out, "\r{}", self.line(label, done))?;
            out.flush()?;
        }
        Ok(())
    }

    fn finish<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.enabled {
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Removes the base worktree when the run ends, then disarms the interrupt
/// cleanup. Release is idempotent, so racing the signal handler is harmless.
struct BaseCheckout<'a> {
    worktree: Option<Worktree>,
    interrupts: &'a InterruptCoordinator,
}

impl Drop for BaseCheckout<'_> {
    fn drop(&mut self) {
        drop(self.worktree.take());
        self.interrupts.clear_cleanup();
    }
}

/// One ratchet run over a repository.
///
/// Human-facing output goes to the writers passed to [`Ratchet::run`]:
/// values, progress and `Succeeded` to `out`; diagnostics and `Failed` to
/// `err`.
#[derive(Debug)]
pub struct Ratchet {
    options: Options,
    repo_root: PathBuf,
    worktrees: WorktreeManager,
    executor: CommandExecutor,
    color_diagnostics: bool,
}

impl Ratchet {
    pub fn new(options: Options, repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        Self {
            options,
            worktrees: WorktreeManager::new(repo_root.clone()),
            repo_root,
            executor: CommandExecutor::new(),
            color_diagnostics: std::io::stderr().is_terminal(),
        }
    }

    /// Replace the worktree manager (temp root, CI override).
    pub fn with_worktree_manager(mut self, worktrees: WorktreeManager) -> Self {
        self.worktrees = worktrees;
        self
    }

    /// Colour `Failed` on the diagnostic writer. Defaults to whether stderr
    /// is a terminal.
    pub fn with_diagnostic_color(mut self, enabled: bool) -> Self {
        self.color_diagnostics = enabled;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn run<O: Write, E: Write>(
        &self,
        interrupts: &InterruptCoordinator,
        out: &mut O,
        err: &mut E,
    ) -> Result<RunOutcome> {
        if !is_git_repository(&self.repo_root) {
            return Err(RatchetError::NotAGitRepository);
        }

        let current_name = current_branch(&self.repo_root);
        let cancel = interrupts.token();

        match &self.options.compare {
            None => self.report(&current_name, &cancel, out, err),
            Some(compare) => self.compare(compare, &current_name, interrupts, out, err),
        }
    }

    /// No comparison: evaluate the current state and print its value.
    fn report<O: Write, E: Write>(
        &self,
        current_name: &str,
        cancel: &CancellationToken,
        out: &mut O,
        err: &mut E,
    ) -> Result<RunOutcome> {
        let progress = ProgressView {
            enabled: false,
            base_ref: "",
            present: self.present_stages(),
        };
        let current = CodeState {
            progress_label: HEAD_LABEL,
            display_name: current_name,
            dir: &self.repo_root,
        };

        let output = match self.evaluate(current, &progress, cancel, out, err)? {
            StateResult::Complete { metric_output } => metric_output,
            StateResult::Failed { stage } => {
                return Ok(RunOutcome::Failed(FailureReason::CommandFailed {
                    stage,
                    branch: current_name.to_string(),
                }));
            }
        };

        match parse_number(&output) {
            Ok(value) => {
                writeln!(out, "{}", format_number(value))?;
                Ok(RunOutcome::Reported(value))
            }
            Err(_) => non_numeric(err, current_name, output, self.color_diagnostics),
        }
    }

    fn compare<O: Write, E: Write>(
        &self,
        compare: &BaseComparison,
        current_name: &str,
        interrupts: &InterruptCoordinator,
        out: &mut O,
        err: &mut E,
    ) -> Result<RunOutcome> {
        let base_ref = compare.base_ref.as_str();
        let cancel = interrupts.token();

        let reference = match self.worktrees.ensure_branch(base_ref) {
            Ok(reference) => reference,
            Err(e) => {
                writeln!(err, "Base branch '{base_ref}' not found")?;
                write_detail(err, &git_detail(&e))?;
                writeln!(err, "{}", failed_word(self.color_diagnostics))?;
                return Ok(RunOutcome::Failed(FailureReason::BranchNotFound {
                    branch: base_ref.to_string(),
                }));
            }
        };

        let worktree = match self
            .worktrees
            .create_worktree_with(&reference, &cancel, |handle| interrupts.register_cleanup(handle))
        {
            Ok(worktree) => worktree,
            Err(GitError::Interrupted) => {
                interrupts.clear_cleanup();
                return Err(RatchetError::Interrupted);
            }
            Err(e) => {
                interrupts.clear_cleanup();
                writeln!(err, "Failed to create worktree for branch '{base_ref}'")?;
                write_detail(err, &git_detail(&e))?;
                writeln!(err, "{}", failed_word(self.color_diagnostics))?;
                return Ok(RunOutcome::Failed(FailureReason::WorktreeCreationFailed {
                    branch: base_ref.to_string(),
                }));
            }
        };
        let base_dir = worktree.path().to_path_buf();
        let _checkout = BaseCheckout {
            worktree: Some(worktree),
            interrupts,
        };

        let progress = ProgressView {
            enabled: self.options.verbose,
            base_ref,
            present: self.present_stages(),
        };
        let base = CodeState {
            progress_label: base_ref,
            display_name: base_ref,
            dir: &base_dir,
        };
        let current = CodeState {
            progress_label: HEAD_LABEL,
            display_name: current_name,
            dir: &self.repo_root,
        };

        let base_output = match self.evaluate(base, &progress, &cancel, out, err)? {
            StateResult::Complete { metric_output } => metric_output,
            StateResult::Failed { stage } => {
                if progress.enabled {
                    writeln!(out, "{}\n", progress.line(HEAD_LABEL, StageFlags::NONE))?;
                }
                return Ok(RunOutcome::Failed(FailureReason::CommandFailed {
                    stage,
                    branch: base_ref.to_string(),
                }));
            }
        };

        let current_output = match self.evaluate(current, &progress, &cancel, out, err)? {
            StateResult::Complete { metric_output } => metric_output,
            StateResult::Failed { stage } => {
                if progress.enabled {
                    writeln!(out)?;
                }
                return Ok(RunOutcome::Failed(FailureReason::CommandFailed {
                    stage,
                    branch: current_name.to_string(),
                }));
            }
        };

        let base_value = match parse_number(&base_output) {
            Ok(value) => value,
            Err(_) => return non_numeric(err, base_ref, base_output, self.color_diagnostics),
        };
        let current_value = match parse_number(&current_output) {
            Ok(value) => value,
            Err(_) => return non_numeric(err, current_name, current_output, self.color_diagnostics),
        };

        self.verdict(compare, current_name, current_value, base_value, out, err)
    }

    /// Run pre, metric and post for one code state.
    ///
    /// Absent stages are skipped and count as done. The first failing stage
    /// ends the state; an interrupted command ends the whole run.
    fn evaluate<O: Write, E: Write>(
        &self,
        state: CodeState<'_>,
        progress: &ProgressView<'_>,
        cancel: &CancellationToken,
        out: &mut O,
        err: &mut E,
    ) -> Result<StateResult> {
        let mut done = StageFlags::NONE;
        let mut metric_output = String::new();
        let mut phase = Phase::NotStarted;

        loop {
            phase = match phase {
                Phase::NotStarted => {
                    progress.start(out, state.progress_label)?;
                    Phase::Running(Stage::Pre)
                }
                Phase::Running(stage) => match self.command(stage) {
                    None => Phase::Done(stage),
                    Some(command) => {
                        debug!("running {stage} in {}: {command}", state.dir.display());
                        match self.executor.execute(command, Some(state.dir), cancel) {
                            Ok(stdout) => {
                                if stage == Stage::Metric {
                                    metric_output = stdout;
                                }
                                mark_done(&mut done, stage);
                                progress.redraw(out, state.progress_label, done)?;
                                Phase::Done(stage)
                            }
                            Err(e) if e.is_interrupted() => return Err(RatchetError::Interrupted),
                            Err(e) => Phase::Failed(stage, command.to_string(), e),
                        }
                    }
                },
                Phase::Done(stage) => match stage.next() {
                    Some(next) => Phase::Running(next),
                    None => Phase::Complete,
                },
                Phase::Failed(stage, command, error) => {
                    if progress.enabled {
                        writeln!(out, "\r{}", progress.line(state.progress_label, done))?;
                    }
                    let kind = if stage == Stage::Metric {
                        "Metric command"
                    } else {
                        "Command"
                    };
                    writeln!(err, "{kind} '{command}' failed in {}", state.display_name)?;
                    write_detail(err, &error.to_string())?;
                    writeln!(err, "{}", failed_word(self.color_diagnostics))?;
                    return Ok(StateResult::Failed { stage });
                }
                Phase::Complete => {
                    progress.finish(out)?;
                    return Ok(StateResult::Complete { metric_output });
                }
            };
        }
    }

    fn verdict<O: Write, E: Write>(
        &self,
        compare: &BaseComparison,
        current_name: &str,
        current: f64,
        base: f64,
        out: &mut O,
        err: &mut E,
    ) -> Result<RunOutcome> {
        let comparison = compare.comparison;
        let verbose = self.options.verbose;

        if comparison.holds(current, base) {
            if verbose {
                writeln!(
                    out,
                    "\n{current_name} metric ({}) is {} {} ({})",
                    format_number(current),
                    comparison.phrase(),
                    compare.base_ref,
                    format_number(base)
                )?;
            }
            writeln!(out, "{}", "Succeeded".green())?;
            return Ok(RunOutcome::Passed { current, base });
        }

        if verbose {
            writeln!(err)?;
        }
        writeln!(
            err,
            "{current_name} metric ({}) is NOT {} {} ({})",
            format_number(current),
            comparison.phrase(),
            compare.base_ref,
            format_number(base)
        )?;
        writeln!(err, "{}", failed_word(self.color_diagnostics))?;
        Ok(RunOutcome::Failed(FailureReason::ComparisonNotSatisfied {
            current,
            base,
        }))
    }

    fn command(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Pre => self.options.pre.as_deref(),
            Stage::Metric => Some(self.options.metric.as_str()),
            Stage::Post => self.options.post.as_deref(),
        }
    }

    fn present_stages(&self) -> StageFlags {
        StageFlags {
            pre: self.options.pre.is_some(),
            metric: true,
            post: self.options.post.is_some(),
        }
    }
}

fn mark_done(done: &mut StageFlags, stage: Stage) {
    match stage {
        Stage::Pre => done.pre = true,
        Stage::Metric => done.metric = true,
        Stage::Post => done.post = true,
    }
}

fn non_numeric<E: Write>(err: &mut E, branch: &str, output: String, color: bool) -> Result<RunOutcome> {
    writeln!(err, "Command output from {branch} is not a number: '{output}'")?;
    writeln!(err, "{}", failed_word(color))?;
    Ok(RunOutcome::Failed(FailureReason::NonNumericOutput {
        branch: branch.to_string(),
        output,
    }))
}

/// `colored` decides from stdout alone, so the diagnostic stream carries its
/// own switch.
fn failed_word(color: bool) -> String {
    if color {
        "Failed".color(Color::Red).to_string()
    } else {
        "Failed".to_string()
    }
}

fn git_detail(error: &GitError) -> String {
    match error {
        GitError::BranchNotFound { detail, .. } | GitError::WorktreeCreationFailed { detail, .. } => {
            detail.clone()
        }
        other => other.to_string(),
    }
}

/// Indent each non-empty line of `detail` under the diagnostic.
fn write_detail<E: Write>(err: &mut E, detail: &str) -> Result<()> {
    for line in detail.lines().filter(|line| !line.trim().is_empty()) {
        writeln!(err, "  {line}")?;
    }
    Ok(())
}
