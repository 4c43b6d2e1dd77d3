use crate::domain::snapshot::CommitSnapshot;
use crate::domain::user::UserRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pull request tracked within a project.
///
/// `open`, `updated_at` and the head/base snapshots are replaced whenever a
/// new push event arrives for the same pull number within the same project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pull {
    /// Provider-assigned pull id.
    pub id: i64,
    pub number: i64,
    pub title: String,
    pub open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub head: CommitSnapshot,
    pub base: CommitSnapshot,
    pub author: UserRef,
    pub project_id: i64,
}
