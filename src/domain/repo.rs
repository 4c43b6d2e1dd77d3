use crate::domain::user::UserRef;
use serde::{Deserialize, Serialize};

/// Remote repository as reported by the hosting provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub owner: UserRef,
}

impl RepoRef {
    /// `owner/name` form used for project lookup and workspace directories.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}
