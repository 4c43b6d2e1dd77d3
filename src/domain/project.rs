use serde::{Deserialize, Serialize};

/// A tracked repository whose pulls are mined for clones.
///
/// Projects are registered out of band; an event for an unregistered
/// (owner, name) pair is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub repo_owner: String,
    pub repo_name: String,
    /// Per-project override for the minimum clone length, in lines.
    pub min_clone_length: Option<usize>,
}
