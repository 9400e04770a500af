//! Terminal results of a run

use std::fmt;

/// The three command stages evaluated per code state, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pre,
    Metric,
    Post,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Pre, Stage::Metric, Stage::Post];

    pub fn next(self) -> Option<Stage> {
        match self {
            Self::Pre => Some(Self::Metric),
            Self::Metric => Some(Self::Post),
            Self::Post => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pre => "pre",
            Self::Metric => "metric",
            Self::Post => "post",
        })
    }
}

/// Why a run failed. Externally every reason maps to "metric test failed";
/// this keeps the detail for library callers.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    CommandFailed { stage: Stage, branch: String },
    NonNumericOutput { branch: String, output: String },
    BranchNotFound { branch: String },
    WorktreeCreationFailed { branch: String },
    ComparisonNotSatisfied { current: f64, base: f64 },
}

/// Result of one ratchet invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No comparison requested; the current metric value
    Reported(f64),
    Passed { current: f64, base: f64 },
    Failed(FailureReason),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}
