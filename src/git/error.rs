use thiserror::Error;

/// Failures while preparing the base checkout.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository")]
    NotAGitRepository,

    #[error("branch '{branch}' not found locally or on remote")]
    BranchNotFound { branch: String, detail: String },

    #[error("failed to create worktree for branch '{branch}': {detail}")]
    WorktreeCreationFailed { branch: String, detail: String },

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Command(#[from] anyhow::Error),
}
