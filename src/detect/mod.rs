//! Clone detection seam.
//!
//! The pipeline is decoupled from algorithm internals: any engine
//! implementing [`CloneDetector`] can be swapped in or benchmarked
//! independently. [`LineHashDetector`] is the shipping implementation.

mod line_hash;

pub use line_hash::LineHashDetector;

use crate::domain::{CodeSnippet, FileEntity, LoadError};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Detection tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Minimum clone length, in lines, on both sides of a pair.
    pub min_clone_length: usize,
}

/// Incrementally produced file content; errors from the underlying loader
/// pass through the stream.
pub type FileStream<'a> = BoxStream<'a, Result<FileEntity, LoadError>>;

/// Finds snippets inside `target_files` that could be copied from
/// `source_files`.
///
/// Guarantees required of every implementation:
/// - each emitted pair is (target snippet, source snippet) with
///   `to_line >= from_line` and at least `min_clone_length` lines on both
///   sides;
/// - both input streams are consumed at most once, incrementally;
/// - a snippet is never paired with itself at the identical
///   (commit, file, line range).
#[async_trait]
pub trait CloneDetector: Send + Sync {
    async fn find_clones(
        &self,
        target_files: FileStream<'_>,
        source_files: FileStream<'_>,
        config: &DetectorConfig,
    ) -> Result<Vec<(CodeSnippet, CodeSnippet)>, LoadError>;
}
