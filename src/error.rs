//! Error types surfaced by the ratchet entry point.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using [`RatchetError`].
pub type Result<T> = std::result::Result<T, RatchetError>;

/// Exit status for a run that could not be evaluated or failed the ratchet.
pub const EXIT_METRIC_FAILED: i32 = 1;
/// Exit status for usage, configuration and environment errors.
pub const EXIT_USAGE: i32 = 2;
/// Exit status after SIGINT/SIGTERM.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Errors returned by [`crate::run`].
///
/// Every evaluation failure (a failing command, a missing base branch,
/// non-numeric output, an unsatisfied comparison) collapses into
/// [`RatchetError::MetricTestFailed`] after a diagnostic has been printed.
/// The finer-grained reason is available from
/// [`crate::ratchet::RunOutcome`] for library callers.
#[derive(Debug, Error)]
pub enum RatchetError {
    #[error("metric test failed")]
    MetricTestFailed,

    #[error("not a git repository")]
    NotAGitRepository,

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RatchetError {
    /// Process exit status the CLI should use for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MetricTestFailed => EXIT_METRIC_FAILED,
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_USAGE,
        }
    }
}
