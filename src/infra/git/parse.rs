//! Parsers for git plumbing output.

use crate::domain::GitError;
use crate::infra::git::types::{DiffEntry, GitFile, ObjectId, TreeEntry};
use std::collections::{BTreeSet, HashMap};

const ZERO_SHA: &str = "0000000000000000000000000000000000000000";

/// Parse `git diff --raw --no-abbrev` records.
///
/// Record shape: `:<src_mode> <dst_mode> <src_sha> <dst_sha> <status>\t<path>[\t<path>]`.
pub(crate) fn raw_diff(out: &[u8]) -> Result<Vec<DiffEntry>, GitError> {
    let text = String::from_utf8_lossy(out);
    let mut entries = Vec::new();

    for line in text.lines() {
        let Some(record) = line.strip_prefix(':') else {
            continue;
        };
        let Some((meta, paths)) = record.split_once('\t') else {
            return Err(malformed("diff", line));
        };
        let fields: Vec<&str> = meta.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(malformed("diff", line));
        }
        let (src_sha, dst_sha, status) = (fields[2], fields[3], fields[4]);
        let mut path_fields = paths.split('\t');

        let entry = match status.as_bytes()[0] {
            b'A' => DiffEntry::Added {
                head: file(dst_sha, path_fields.next(), line)?,
            },
            b'D' => DiffEntry::Deleted {
                base: file(src_sha, path_fields.next(), line)?,
            },
            b'R' | b'C' => {
                let similarity = status[1..].parse::<u8>().unwrap_or(0);
                let base_path = path_fields.next();
                let head_path = path_fields.next();
                DiffEntry::Renamed {
                    base: file(src_sha, base_path, line)?,
                    head: file(dst_sha, head_path, line)?,
                    similarity,
                }
            }
            // M, and T (typechange) which also carries both blobs.
            _ => {
                let path = path_fields.next();
                DiffEntry::Modified {
                    base: file(src_sha, path, line)?,
                    head: file(dst_sha, path, line)?,
                }
            }
        };
        entries.push(entry);
    }
    Ok(entries)
}

fn file(sha: &str, path: Option<&str>, line: &str) -> Result<GitFile, GitError> {
    let path = path.filter(|p| !p.is_empty()).ok_or_else(|| malformed("diff", line))?;
    if sha == ZERO_SHA {
        return Err(malformed("diff", line));
    }
    Ok(GitFile {
        id: ObjectId(sha.to_string()),
        path: path.to_string(),
    })
}

/// Parse `git ls-tree -r --full-tree` output, keeping blob entries.
pub(crate) fn ls_tree(out: &[u8]) -> Result<Vec<TreeEntry>, GitError> {
    let text = String::from_utf8_lossy(out);
    let mut entries = Vec::new();
    for line in text.lines() {
        let Some((meta, path)) = line.split_once('\t') else {
            return Err(malformed("ls-tree", line));
        };
        let fields: Vec<&str> = meta.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(malformed("ls-tree", line));
        }
        if fields[1] != "blob" {
            continue;
        }
        entries.push(TreeEntry {
            id: ObjectId(fields[2].to_string()),
            path: path.to_string(),
        });
    }
    Ok(entries)
}

/// Parse `git cat-file --batch` output into id -> content.
///
/// Any `missing` record fails the whole batch; callers never see a partial
/// result.
pub(crate) fn cat_file_batch(out: &[u8]) -> Result<HashMap<ObjectId, String>, GitError> {
    let mut contents = HashMap::new();
    let mut pos = 0;

    while pos < out.len() {
        let header_end = out[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|offset| pos + offset)
            .ok_or_else(|| malformed("cat-file", "truncated batch header"))?;
        let header = String::from_utf8_lossy(&out[pos..header_end]);
        let fields: Vec<&str> = header.split_whitespace().collect();

        match fields.as_slice() {
            [id, "missing"] => {
                return Err(GitError::operation(
                    "cat-file",
                    format!("missing object {id}"),
                ));
            }
            [id, _kind, size] => {
                let size: usize = size
                    .parse()
                    .map_err(|_| malformed("cat-file", &header))?;
                let body_start = header_end + 1;
                let body_end = body_start + size;
                if body_end > out.len() {
                    return Err(malformed("cat-file", "truncated batch body"));
                }
                let content = String::from_utf8_lossy(&out[body_start..body_end]).into_owned();
                contents.insert(ObjectId(id.to_string()), content);
                // +1 skips the newline git appends after each object body.
                pos = body_end + 1;
            }
            _ => return Err(malformed("cat-file", &header)),
        }
    }
    Ok(contents)
}

pub(crate) fn remote_names(out: &[u8]) -> BTreeSet<String> {
    String::from_utf8_lossy(out)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn malformed(command: &str, line: &str) -> GitError {
    GitError::operation(command, format!("unexpected output: {line}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const SHA_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

    #[test]
    fn parses_added_modified_and_deleted_records() {
        let raw = format!(
            ":000000 100644 {ZERO_SHA} {SHA_A} A\tsrc/new.rs\n\
             :100644 100644 {SHA_B} {SHA_C} M\tsrc/lib.rs\n\
             :100644 000000 {SHA_A} {ZERO_SHA} D\told.txt\n"
        );
        let entries = raw_diff(raw.as_bytes()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            DiffEntry::Added {
                head: GitFile {
                    id: ObjectId(SHA_A.into()),
                    path: "src/new.rs".into(),
                }
            }
        );
        assert!(matches!(&entries[1], DiffEntry::Modified { base, head }
            if base.id.as_str() == SHA_B && head.id.as_str() == SHA_C));
        assert!(matches!(&entries[2], DiffEntry::Deleted { base }
            if base.path == "old.txt"));
    }

    #[test]
    fn parses_rename_with_similarity_and_both_paths() {
        let raw = format!(":100644 100644 {SHA_A} {SHA_B} R097\ta/before.rs\tb/after.rs\n");
        let entries = raw_diff(raw.as_bytes()).unwrap();
        match &entries[0] {
            DiffEntry::Renamed {
                base,
                head,
                similarity,
            } => {
                assert_eq!(base.path, "a/before.rs");
                assert_eq!(head.path, "b/after.rs");
                assert_eq!(*similarity, 97);
            }
            other => panic!("expected rename, got {other:?}"),
        }
    }

    #[test]
    fn diff_entry_object_ids_skips_absent_sides() {
        let raw = format!(":000000 100644 {ZERO_SHA} {SHA_A} A\tnew.rs\n");
        let entries = raw_diff(raw.as_bytes()).unwrap();
        let ids: Vec<&ObjectId> = entries[0].object_ids().collect();
        assert_eq!(ids, vec![&ObjectId(SHA_A.into())]);
    }

    #[test]
    fn ls_tree_keeps_blobs_only() {
        let out = format!(
            "040000 tree {SHA_A}\tsrc\n\
             100644 blob {SHA_B}\tsrc/main.rs\n\
             100755 blob {SHA_C}\tscripts/run.sh\n"
        );
        let entries = ls_tree(out.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "src/main.rs");
        assert_eq!(entries[1].path, "scripts/run.sh");
    }

    #[test]
    fn cat_file_batch_maps_every_object() {
        let out = format!("{SHA_A} blob 5\nhello\n{SHA_B} blob 3\nhi\n\n");
        let contents = cat_file_batch(out.as_bytes()).unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[&ObjectId(SHA_A.into())], "hello");
        assert_eq!(contents[&ObjectId(SHA_B.into())], "hi\n");
    }

    #[test]
    fn cat_file_batch_fails_whole_batch_on_missing_object() {
        let out = format!("{SHA_A} blob 5\nhello\n{SHA_B} missing\n");
        let err = cat_file_batch(out.as_bytes()).unwrap_err();
        assert!(matches!(err, GitError::Operation { .. }));
    }

    #[test]
    fn cat_file_batch_empty_output_is_empty_map() {
        assert!(cat_file_batch(b"").unwrap().is_empty());
    }

    #[test]
    fn remote_names_are_sorted_and_deduplicated() {
        let names = remote_names(b"origin\nupstream\norigin\n");
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["origin".to_string(), "upstream".to_string()]
        );
    }
}
