//! Materializes the files present at a commit snapshot through the git
//! workspace.

use crate::domain::{CommitSnapshot, FileEntity, FileFilter, LoadError, RepoRef};
use crate::infra::git::{GitRepo, GitWorkspace, ObjectId};
use std::sync::Arc;

type RemoteUrlFn = dyn Fn(&RepoRef) -> String + Send + Sync;

/// Loads file content for commit snapshots, cloning and fetching on demand.
#[derive(Clone)]
pub struct FileLoader {
    workspace: GitWorkspace,
    remote_url: Arc<RemoteUrlFn>,
}

impl FileLoader {
    /// Loader resolving remotes on github.com.
    pub fn new(workspace: GitWorkspace) -> Self {
        Self::with_remote_urls(workspace, |repo| {
            format!("https://github.com/{}/{}.git", repo.owner.login, repo.name)
        })
    }

    /// Loader with a custom remote-url scheme (enterprise hosts, local
    /// mirrors, tests).
    pub fn with_remote_urls(
        workspace: GitWorkspace,
        remote_url: impl Fn(&RepoRef) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            workspace,
            remote_url: Arc::new(remote_url),
        }
    }

    /// Files at the snapshot's commit that pass `filter`, in tree order.
    ///
    /// The repository is cloned on first use; if the commit is unknown
    /// locally one fetch is attempted before giving up.
    pub async fn load_files(
        &self,
        snapshot: &CommitSnapshot,
        filter: &FileFilter,
    ) -> Result<Vec<FileEntity>, LoadError> {
        let repo = self.resolve(snapshot).await?;

        let tree = repo.ls_tree(&snapshot.sha).await?;
        let wanted: Vec<_> = tree
            .into_iter()
            .filter(|entry| filter.accepts(&entry.path))
            .collect();
        let ids: Vec<ObjectId> = wanted.iter().map(|entry| entry.id.clone()).collect();
        let contents = repo.cat_files(&ids).await?;

        Ok(wanted
            .into_iter()
            .filter_map(|entry| {
                contents.get(&entry.id).map(|content| FileEntity {
                    snapshot: snapshot.clone(),
                    path: entry.path,
                    content: content.clone(),
                })
            })
            .collect())
    }

    async fn resolve(&self, snapshot: &CommitSnapshot) -> Result<GitRepo, LoadError> {
        let dir_name = snapshot.repo.full_name();
        let url = (self.remote_url)(&snapshot.repo);
        let repo = self.workspace.clone_repo(&url, &dir_name).await?;

        if repo.contains_commit(&snapshot.sha).await {
            return Ok(repo);
        }
        repo.fetch().await?;
        if repo.contains_commit(&snapshot.sha).await {
            return Ok(repo);
        }
        Err(LoadError::UnresolvedRef {
            repo: dir_name,
            reference: snapshot.sha.clone(),
        })
    }
}
