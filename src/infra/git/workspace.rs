//! Workspace manager: the sole arbiter of access to on-disk clones.

use crate::domain::GitError;
use crate::infra::git::repo::GitRepo;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::{RwLock, Semaphore};

/// External git processes per CPU core. These tasks are process-wait-bound,
/// not CPU-bound.
const PERMITS_PER_CORE: usize = 3;

/// Manages local clones of remote repositories under one root directory.
///
/// Cheap to clone; all copies share the same lock registry and permit pool.
#[derive(Clone)]
pub struct GitWorkspace {
    inner: Arc<WorkspaceInner>,
}

#[derive(Debug)]
pub(crate) struct WorkspaceInner {
    root: PathBuf,
    git_bin: PathBuf,
    permits: Semaphore,
    /// Directory path -> its read/write lock. Every caller derives the key
    /// through [`WorkspaceInner::dir_path`], so the uncanonicalized join is
    /// a stable identity even before the directory exists on disk.
    locks: parking_lot::Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>,
}

impl GitWorkspace {
    /// Create a workspace rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, GitError> {
        let git_bin =
            which::which("git").map_err(|e| GitError::operation("locate git binary", e))?;
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| GitError::operation("create workspace root", e))?;

        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Ok(Self {
            inner: Arc::new(WorkspaceInner {
                root,
                git_bin,
                permits: Semaphore::new(cores * PERMITS_PER_CORE),
                locks: parking_lot::Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Clone `remote_url` into `dir_name` under the workspace root.
    ///
    /// Idempotent: if a valid clone already exists there, a handle to it is
    /// returned without re-cloning. Concurrent calls for the same directory
    /// serialize behind its write lock, so at most one physical `git clone`
    /// runs; calls for different directories proceed in parallel up to the
    /// permit pool size.
    pub async fn clone_repo(&self, remote_url: &str, dir_name: &str) -> Result<GitRepo, GitError> {
        let dir = self.inner.dir_path(dir_name);
        let lock = self.inner.lock_for(&dir);
        let _guard = lock.write().await;

        if dir.exists() {
            if self.inner.is_repository(&dir).await? {
                return Ok(self.handle(dir, lock.clone()));
            }
            return Err(GitError::operation(
                "clone",
                format!("{} exists but is not a git repository", dir.display()),
            ));
        }

        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GitError::operation("create clone parent dir", e))?;
        }
        let dir_arg = dir.to_string_lossy().into_owned();
        self.inner
            .run_git(&self.inner.root, &["clone", remote_url, &dir_arg])
            .await?;
        Ok(self.handle(dir, lock.clone()))
    }

    /// Resolve an existing local clone without cloning.
    pub async fn repo(&self, dir_name: &str) -> Result<GitRepo, GitError> {
        let dir = self.inner.dir_path(dir_name);
        let lock = self.inner.lock_for(&dir);
        let _guard = lock.read().await;

        if !dir.is_dir() || !self.inner.is_repository(&dir).await? {
            return Err(GitError::NotFound(dir.display().to_string()));
        }
        Ok(self.handle(dir, lock.clone()))
    }

    fn handle(&self, dir: PathBuf, lock: Arc<RwLock<()>>) -> GitRepo {
        GitRepo::new(Arc::clone(&self.inner), dir, lock)
    }
}

impl WorkspaceInner {
    fn dir_path(&self, dir_name: &str) -> PathBuf {
        self.root.join(dir_name)
    }

    pub(crate) fn lock_for(&self, dir: &Path) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(dir.to_path_buf())
                .or_insert_with(|| Arc::new(RwLock::new(()))),
        )
    }

    /// Whether `dir` holds a git repository. Callers hold the directory lock.
    ///
    /// The `.git` check keeps git's upward repository discovery from
    /// mistaking a plain directory inside some other checkout for a clone.
    pub(crate) async fn is_repository(&self, dir: &Path) -> Result<bool, GitError> {
        if !dir.join(".git").exists() {
            return Ok(false);
        }
        match self.run_git(dir, &["rev-parse", "--git-dir"]).await {
            Ok(_) => Ok(true),
            Err(GitError::Operation { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Run git with the given arguments in `dir`, returning stdout.
    ///
    /// Gated by the workspace permit pool so concurrent external processes
    /// stay bounded. A non-zero exit becomes `GitError::Operation` carrying
    /// the trimmed stderr.
    pub(crate) async fn run_git(&self, dir: &Path, args: &[&str]) -> Result<Vec<u8>, GitError> {
        self.run_git_with_stdin(dir, args, None).await
    }

    pub(crate) async fn run_git_with_stdin(
        &self,
        dir: &Path,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, GitError> {
        let label = args.first().copied().unwrap_or("git");
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("workspace permit pool closed");

        let mut command = Command::new(&self.git_bin);
        command
            .arg("-C")
            .arg(dir)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| GitError::operation(label, e))?;

        if let Some(bytes) = stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(bytes)
                .await
                .map_err(|e| GitError::operation(label, e))?;
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| GitError::operation(label, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::operation(label, stderr.trim()));
        }
        Ok(output.stdout)
    }
}
