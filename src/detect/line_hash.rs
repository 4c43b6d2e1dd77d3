//! Windowed line-fingerprint clone detection.
//!
//! Every window of `min_clone_length` consecutive normalized lines is
//! fingerprinted with XXH64. Source windows go into an in-memory index as
//! the source stream arrives; target windows are then probed against the
//! index and runs of consecutive matches with a constant line offset are
//! merged into maximal snippet pairs. Only fingerprints and file metadata
//! are retained, never both sides' full text.

use crate::detect::{CloneDetector, DetectorConfig, FileStream};
use crate::domain::{CodeSnippet, CommitSnapshot, LoadError};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

pub struct LineHashDetector;

struct SourceFile {
    snapshot: CommitSnapshot,
    path: String,
}

#[derive(Clone, Copy)]
struct WindowRef {
    file: usize,
    from_line: u32,
}

#[async_trait]
impl CloneDetector for LineHashDetector {
    async fn find_clones(
        &self,
        mut target_files: FileStream<'_>,
        mut source_files: FileStream<'_>,
        config: &DetectorConfig,
    ) -> Result<Vec<(CodeSnippet, CodeSnippet)>, LoadError> {
        let window = config.min_clone_length.max(1);

        let mut files: Vec<SourceFile> = Vec::new();
        let mut index: HashMap<u64, Vec<WindowRef>> = HashMap::new();
        while let Some(entity) = source_files.try_next().await? {
            let lines = normalized_lines(&entity.content);
            if lines.len() < window {
                continue;
            }
            let file = files.len();
            for (offset, hash) in window_hashes(&lines, window).into_iter().enumerate() {
                index.entry(hash).or_default().push(WindowRef {
                    file,
                    from_line: offset as u32 + 1,
                });
            }
            files.push(SourceFile {
                snapshot: entity.snapshot,
                path: entity.path,
            });
        }

        let mut pairs = Vec::new();
        while let Some(entity) = target_files.try_next().await? {
            let lines = normalized_lines(&entity.content);
            if lines.len() < window {
                continue;
            }

            // One row per matching window pair: (source file, line offset
            // between the sides, target window start).
            let mut matches: Vec<(usize, i64, u32)> = Vec::new();
            for (offset, hash) in window_hashes(&lines, window).into_iter().enumerate() {
                let target_from = offset as u32 + 1;
                if let Some(hits) = index.get(&hash) {
                    for hit in hits {
                        matches.push((
                            hit.file,
                            hit.from_line as i64 - target_from as i64,
                            target_from,
                        ));
                    }
                }
            }
            matches.sort_unstable();
            matches.dedup();

            // Runs of consecutive target windows against one source file at
            // one offset collapse into a single maximal pair.
            let mut runs: Vec<(usize, i64, u32, u32)> = Vec::new();
            for (file, delta, from) in matches {
                match runs.last_mut() {
                    Some((run_file, run_delta, _, end))
                        if *run_file == file && *run_delta == delta && *end + 1 == from =>
                    {
                        *end = from;
                    }
                    _ => runs.push((file, delta, from, from)),
                }
            }

            for (file, delta, start, end) in runs {
                let source = &files[file];
                let target_from = start;
                let target_to = end + window as u32 - 1;
                let source_from = (start as i64 + delta) as u32;
                let source_to = source_from + (target_to - target_from);

                let identical = source.snapshot.sha == entity.snapshot.sha
                    && source.snapshot.repo.id == entity.snapshot.repo.id
                    && source.path == entity.path
                    && source_from == target_from;
                if identical {
                    continue;
                }

                pairs.push((
                    CodeSnippet {
                        snapshot: entity.snapshot.clone(),
                        file: entity.path.clone(),
                        from_line: target_from,
                        to_line: target_to,
                    },
                    CodeSnippet {
                        snapshot: source.snapshot.clone(),
                        file: source.path.clone(),
                        from_line: source_from,
                        to_line: source_to,
                    },
                ));
            }
        }
        Ok(pairs)
    }
}

fn normalized_lines(content: &str) -> Vec<String> {
    content.lines().map(|line| line.trim().to_string()).collect()
}

fn window_hashes(lines: &[String], window: usize) -> Vec<u64> {
    if lines.len() < window {
        return Vec::new();
    }
    (0..=lines.len() - window)
        .map(|start| {
            let mut hasher = XxHash64::with_seed(0);
            for line in &lines[start..start + window] {
                hasher.write(line.as_bytes());
                // Separator keeps differently-split lines from colliding.
                hasher.write_u8(0xfe);
            }
            hasher.finish()
        })
        .collect()
}
