//! File content units flowing between the loader and the detection engine.

use crate::domain::snapshot::CommitSnapshot;
use std::fmt;
use std::sync::Arc;

/// Content of one file at one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntity {
    pub snapshot: CommitSnapshot,
    pub path: String,
    pub content: String,
}

/// Predicate over repository-relative paths deciding which files take part
/// in clone detection.
#[derive(Clone)]
pub struct FileFilter {
    inner: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

/// Extensions that never carry line-oriented source text.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "svg", "pdf", "zip", "tar", "gz", "jar", "class", "exe",
    "dll", "so", "dylib", "bin", "woff", "woff2", "ttf",
];

/// Generated files and build output that would drown detection in noise.
const ARTIFACT_NAMES: &[&str] = &["Cargo.lock", "package-lock.json", "yarn.lock", "Gemfile.lock"];
const ARTIFACT_DIRS: &[&str] = &["target/", "build/", "dist/", "node_modules/", "vendor/"];

impl FileFilter {
    /// Accept every path.
    pub fn all() -> Self {
        Self::from_fn(|_| true)
    }

    /// Accept source-like paths, excluding binaries, lockfiles and build
    /// output.
    pub fn sources() -> Self {
        Self::from_fn(|path| {
            let name = path.rsplit('/').next().unwrap_or(path);
            if ARTIFACT_NAMES.contains(&name) {
                return false;
            }
            if ARTIFACT_DIRS
                .iter()
                .any(|dir| path.starts_with(dir) || path.contains(&format!("/{dir}")))
            {
                return false;
            }
            match name.rsplit_once('.') {
                Some((_, ext)) => !BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
                None => true,
            }
        })
    }

    pub fn from_fn(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(predicate),
        }
    }

    pub fn accepts(&self, path: &str) -> bool {
        (self.inner)(path)
    }
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileFilter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_accepts_everything() {
        let filter = FileFilter::all();
        assert!(filter.accepts("logo.png"));
        assert!(filter.accepts("src/main.rs"));
    }

    #[test]
    fn sources_rejects_binaries_and_artifacts() {
        let filter = FileFilter::sources();
        assert!(filter.accepts("src/main.rs"));
        assert!(filter.accepts("Makefile"));
        assert!(!filter.accepts("assets/logo.PNG"));
        assert!(!filter.accepts("Cargo.lock"));
        assert!(!filter.accepts("target/debug/build.rs"));
        assert!(!filter.accepts("web/node_modules/left-pad/index.js"));
    }
}
