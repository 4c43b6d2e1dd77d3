//! Repository handle: plumbing operations over one local clone.

use crate::domain::GitError;
use crate::infra::git::parse;
use crate::infra::git::types::{DiffEntry, FileEntry, ObjectId, TreeEntry};
use crate::infra::git::workspace::WorkspaceInner;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Handle to one on-disk clone managed by a
/// [`GitWorkspace`](crate::infra::git::GitWorkspace).
///
/// Cheap to clone and safe to use from many tasks at once: mutating
/// operations (fetch, remote changes) take the directory's write lock,
/// reads share the read lock, so a read can never observe a torn ref.
#[derive(Clone, Debug)]
pub struct GitRepo {
    workspace: Arc<WorkspaceInner>,
    dir: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl GitRepo {
    pub(crate) fn new(workspace: Arc<WorkspaceInner>, dir: PathBuf, lock: Arc<RwLock<()>>) -> Self {
        Self {
            workspace,
            dir,
            lock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Update all remote-tracking refs.
    ///
    /// Overlapping fetch requests queue behind the write lock; each runs to
    /// completion against a consistent working copy.
    pub async fn fetch(&self) -> Result<(), GitError> {
        let _guard = self.lock.write().await;
        self.workspace
            .run_git(&self.dir, &["fetch", "--all"])
            .await?;
        Ok(())
    }

    /// Changed entries between two refs.
    ///
    /// `context_lines` is forwarded to git but the returned set and order of
    /// entries comes from raw records, which context size cannot affect.
    pub async fn diff(
        &self,
        base_ref: &str,
        head_ref: &str,
        context_lines: u32,
    ) -> Result<Vec<DiffEntry>, GitError> {
        let _guard = self.lock.read().await;
        let context = format!("-U{context_lines}");
        let out = self
            .workspace
            .run_git(
                &self.dir,
                &[
                    "diff",
                    context.as_str(),
                    "--raw",
                    "--no-abbrev",
                    "--find-renames",
                    base_ref,
                    head_ref,
                ],
            )
            .await?;
        parse::raw_diff(&out)
    }

    /// Batch blob retrieval. Empty input yields an empty map without
    /// spawning git; any unknown id fails the whole batch.
    pub async fn cat_files(
        &self,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, String>, GitError> {
        let _guard = self.lock.read().await;
        self.cat_files_locked(ids).await
    }

    /// Files with content present at `reference`, in tree order.
    pub async fn show(&self, reference: &str) -> Result<Vec<FileEntry>, GitError> {
        let _guard = self.lock.read().await;
        let tree = self.ls_tree_locked(reference).await?;
        let ids: Vec<ObjectId> = tree.iter().map(|entry| entry.id.clone()).collect();
        let contents = self.cat_files_locked(&ids).await?;
        // Two paths may share one blob, so look up rather than drain.
        Ok(tree
            .into_iter()
            .filter_map(|entry| {
                contents.get(&entry.id).map(|content| FileEntry {
                    path: entry.path,
                    content: content.clone(),
                })
            })
            .collect())
    }

    /// Paths (with blob ids) present at `reference`, in tree order.
    pub async fn ls_tree(&self, reference: &str) -> Result<Vec<TreeEntry>, GitError> {
        let _guard = self.lock.read().await;
        self.ls_tree_locked(reference).await
    }

    /// Names of configured remotes.
    pub async fn remote(&self) -> Result<BTreeSet<String>, GitError> {
        let _guard = self.lock.read().await;
        let out = self.workspace.run_git(&self.dir, &["remote"]).await?;
        Ok(parse::remote_names(&out))
    }

    /// Add a remote. Adding a name that already exists is a no-op success,
    /// so concurrent duplicate adds cannot fail each other.
    pub async fn remote_add(&self, url: &str, name: &str) -> Result<(), GitError> {
        let _guard = self.lock.write().await;
        match self
            .workspace
            .run_git(&self.dir, &["remote", "add", name, url])
            .await
        {
            Ok(_) => Ok(()),
            Err(GitError::Operation { detail, .. }) if detail.contains("already exists") => Ok(()),
            Err(other) => Err(other),
        }
    }

    /// Fetch updates from the named remote. Last writer wins under
    /// concurrent updates of the same name.
    pub async fn remote_update(&self, name: &str) -> Result<(), GitError> {
        let _guard = self.lock.write().await;
        self.workspace
            .run_git(&self.dir, &["remote", "update", name])
            .await?;
        Ok(())
    }

    /// Whether `reference` resolves to a commit in this clone.
    pub async fn contains_commit(&self, reference: &str) -> bool {
        let _guard = self.lock.read().await;
        let spec = format!("{reference}^{{commit}}");
        self.workspace
            .run_git(&self.dir, &["rev-parse", "--verify", "--quiet", &spec])
            .await
            .is_ok()
    }

    async fn ls_tree_locked(&self, reference: &str) -> Result<Vec<TreeEntry>, GitError> {
        let out = self
            .workspace
            .run_git(&self.dir, &["ls-tree", "-r", "--full-tree", reference])
            .await?;
        parse::ls_tree(&out)
    }

    async fn cat_files_locked(
        &self,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, String>, GitError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut stdin = String::with_capacity(ids.len() * 41);
        for id in ids {
            stdin.push_str(id.as_str());
            stdin.push('\n');
        }
        let out = self
            .workspace
            .run_git_with_stdin(&self.dir, &["cat-file", "--batch"], Some(stdin.as_bytes()))
            .await?;
        parse::cat_file_batch(&out)
    }
}
