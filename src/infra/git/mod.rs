//! Concurrent git workspace management.
//!
//! [`GitWorkspace`] owns a root directory of local clones and hands out
//! [`GitRepo`] handles. All plumbing shells out to the `git` binary through
//! a bounded permit pool; a per-directory read/write lock keeps overlapping
//! requests from corrupting a working copy.

mod parse;
mod repo;
mod types;
mod workspace;

pub use repo::GitRepo;
pub use types::{DiffEntry, FileEntry, GitFile, ObjectId, TreeEntry};
pub use workspace::GitWorkspace;
