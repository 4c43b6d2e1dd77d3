//! Domain error types for clonewatch.
//!
//! Each subsystem carries its own error enum; `PipelineError` aggregates
//! them at the event-processing boundary.

use thiserror::Error;

/// Errors from git plumbing operations.
#[derive(Debug, Clone, Error)]
pub enum GitError {
    #[error("Repository not found: {0}")]
    NotFound(String),

    #[error("git {command} failed: {detail}")]
    Operation { command: String, detail: String },
}

impl GitError {
    pub(crate) fn operation(command: impl Into<String>, detail: impl ToString) -> Self {
        GitError::Operation {
            command: command.into(),
            detail: detail.to_string(),
        }
    }
}

/// Errors from loading file content for a commit snapshot.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Cannot resolve ref {reference} in {repo} after fetch")]
    UnresolvedRef { repo: String, reference: String },

    #[error("Git error: {0}")]
    Git(#[from] GitError),
}

/// Errors from the persistence layer.
///
/// Carries rendered messages rather than driver errors so event-level
/// failures stay cheaply cloneable across shared futures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Constraint violation beyond the anticipated natural-key idempotence.
    #[error("Persistence conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Sqlite(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, message)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(message.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => StoreError::Sqlite(err.to_string()),
        }
    }
}

/// Malformed webhook payload.
#[derive(Debug, Clone, Error)]
#[error("Invalid webhook payload: {0}")]
pub struct ValidationError(pub String);

/// Event-level aggregate error surfaced by the pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
