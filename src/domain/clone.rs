//! Detected clone domain types.

use crate::domain::snapshot::CommitSnapshot;
use serde::{Deserialize, Serialize};

/// Contiguous line range in one file at one commit. Lines are 1-based and
/// inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub snapshot: CommitSnapshot,
    pub file: String,
    pub from_line: u32,
    pub to_line: u32,
}

impl CodeSnippet {
    pub fn line_count(&self) -> u32 {
        self.to_line - self.from_line + 1
    }
}

/// One detected duplication. The target side is the newer, incoming code;
/// the source side is the earlier code it is suspected to be copied from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRecord {
    /// Assigned on insert.
    pub id: Option<i64>,
    pub target_sha: String,
    pub target_repo_id: i64,
    pub target_file: String,
    pub target_from_line: u32,
    pub target_to_line: u32,
    pub source_sha: String,
    pub source_repo_id: i64,
    pub source_file: String,
    pub source_from_line: u32,
    pub source_to_line: u32,
}

impl CloneRecord {
    /// Build a record from a (target, source) snippet pair emitted by the
    /// detection engine.
    pub fn between(target: &CodeSnippet, source: &CodeSnippet) -> Self {
        Self {
            id: None,
            target_sha: target.snapshot.sha.clone(),
            target_repo_id: target.snapshot.repo.id,
            target_file: target.file.clone(),
            target_from_line: target.from_line,
            target_to_line: target.to_line,
            source_sha: source.snapshot.sha.clone(),
            source_repo_id: source.snapshot.repo.id,
            source_file: source.file.clone(),
            source_from_line: source.from_line,
            source_to_line: source.to_line,
        }
    }
}
