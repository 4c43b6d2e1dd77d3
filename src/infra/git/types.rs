use serde::{Deserialize, Serialize};
use std::fmt;

/// Git blob identifier (full 40-character hex sha).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of a diff entry: a blob and the path it lives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitFile {
    pub id: ObjectId,
    pub path: String,
}

/// A single changed path between two refs.
///
/// The entry set is derived from `git diff --raw` records, so it is
/// independent of the amount of unified-diff context requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEntry {
    Added { head: GitFile },
    Deleted { base: GitFile },
    Modified { base: GitFile, head: GitFile },
    Renamed { base: GitFile, head: GitFile, similarity: u8 },
}

impl DiffEntry {
    /// Blob ids present on either side of the entry.
    pub fn object_ids(&self) -> impl Iterator<Item = &ObjectId> {
        let (base, head) = match self {
            DiffEntry::Added { head } => (None, Some(&head.id)),
            DiffEntry::Deleted { base } => (Some(&base.id), None),
            DiffEntry::Modified { base, head } | DiffEntry::Renamed { base, head, .. } => {
                (Some(&base.id), Some(&head.id))
            }
        };
        base.into_iter().chain(head)
    }
}

/// Path and content of one file at some ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

/// Path and blob id of one file at some ref, without content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub id: ObjectId,
    pub path: String,
}
