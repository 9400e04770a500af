//! Ratchet: keep a numeric code metric from regressing.
//!
//! A user-supplied shell command prints a number (lines of code, warnings,
//! test runtime). `ratchet` runs it on a base branch in a temporary git
//! worktree and on the current checkout, then fails unless the two values
//! satisfy the configured relation.

pub mod config;
pub mod error;
pub mod git;
pub mod interrupt;
pub mod logging;
pub mod parser;
pub mod process;
pub mod ratchet;

pub use error::{RatchetError, Result};
pub use ratchet::{run, Comparison, Options, RunOutcome};
