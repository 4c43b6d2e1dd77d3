//! Commit snapshot domain types.

use crate::domain::repo::RepoRef;
use serde::{Deserialize, Serialize};

/// A specific commit of a specific repository.
///
/// Identified by (sha, repo id). Multiple pulls may share one snapshot;
/// `pull_id` is carried only for single-association inserts, the persisted
/// association lives in its own table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSnapshot {
    /// Full 40-character commit sha.
    pub sha: String,
    /// Repository the commit belongs to.
    pub repo: RepoRef,
    /// Branch (ref name) the snapshot was taken from.
    pub branch: String,
    /// Pull this snapshot was observed on, if any.
    pub pull_id: Option<i64>,
}

/// Natural key of a [`CommitSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId {
    pub sha: String,
    pub repo_id: i64,
}

impl CommitSnapshot {
    pub fn id(&self) -> SnapshotId {
        SnapshotId {
            sha: self.sha.clone(),
            repo_id: self.repo.id,
        }
    }

    pub fn with_pull(mut self, pull_id: i64) -> Self {
        self.pull_id = Some(pull_id);
        self
    }
}
