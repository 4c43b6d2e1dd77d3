//! Event pipeline: resolves identities for an incoming pull event, selects
//! candidate clone sources, runs detection and persists results.

use crate::application::loader::FileLoader;
use crate::detect::{CloneDetector, DetectorConfig};
use crate::domain::{CloneRecord, CommitSnapshot, FileFilter, LoadError, PipelineError};
use crate::infra::db::Database;
use crate::infra::db::repository::{
    CloneRepository, ProjectRepository, PullRepository, RepoRepository, SnapshotRepository,
    UserRepository,
};
use crate::infra::github::{self, WebhookPayload};
use futures::{FutureExt, StreamExt, TryStreamExt, stream};
use std::sync::Arc;

/// What processing an event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed { clones: usize },
    /// The event's repository is not registered as a project. A no-op,
    /// not a failure.
    UntrackedProject,
}

/// Wires the workspace, detector and store together per incoming event.
///
/// Cheap to clone; all copies share one set of collaborators.
#[derive(Clone)]
pub struct ClonePipeline {
    inner: Arc<Inner>,
}

struct Inner {
    users: UserRepository,
    repos: RepoRepository,
    projects: ProjectRepository,
    snapshots: SnapshotRepository,
    pulls: PullRepository,
    clones: CloneRepository,
    loader: FileLoader,
    detector: Box<dyn CloneDetector>,
    filter: FileFilter,
    default_min_clone_length: usize,
}

impl ClonePipeline {
    pub fn new(
        db: &Database,
        loader: FileLoader,
        detector: Box<dyn CloneDetector>,
        filter: FileFilter,
        default_min_clone_length: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                users: db.user_repo(),
                repos: db.repo_repo(),
                projects: db.project_repo(),
                snapshots: db.snapshot_repo(),
                pulls: db.pull_repo(),
                clones: db.clone_repo(),
                loader,
                detector,
                filter,
                default_min_clone_length,
            }),
        }
    }

    /// Run the pipeline for one event and wait for the result.
    ///
    /// Reprocessing an identical payload cannot duplicate snapshots, pulls
    /// or associations; those inserts are natural-key upserts.
    pub async fn process(&self, payload: &WebhookPayload) -> Result<Outcome, PipelineError> {
        let pull_number = payload.pull_request.number;
        let updated_at = payload.pull_request.updated_at;
        let owner = payload.repository.owner.login.clone();
        let repo_name = payload.repository.name.clone();

        // Validate up front; nothing runs on a malformed payload.
        let head = github::snapshot(
            &payload.pull_request.head,
            None,
            Some(payload.pull_request.id),
        )?;
        let base = github::snapshot(
            &payload.pull_request.base,
            Some(&payload.repository),
            Some(payload.pull_request.id),
        )?;
        let author = github::user(&payload.pull_request.user);

        // Computed at most once and shared by every downstream stage.
        let snapshots_ready = {
            let inner = Arc::clone(&self.inner);
            let head = head.clone();
            async move {
                inner.users.upsert(&author)?;
                inner.repos.upsert(&head.repo)?;
                inner.repos.upsert(&base.repo)?;
                inner.snapshots.insert_all(&[head.clone(), base])?;
                Ok::<CommitSnapshot, PipelineError>(head)
            }
        }
        .boxed()
        .shared();

        let Some(project) = self.inner.projects.find_by_repo(&owner, &repo_name)? else {
            log::debug!("ignoring event for untracked repository {owner}/{repo_name}");
            return Ok(Outcome::UntrackedProject);
        };

        let pull = github::pull(payload, project.id)?;

        // Pull update and clone mining run independently; whichever side
        // fails, a re-delivery of the event self-heals via the upserts.
        let update_pull = {
            let inner = Arc::clone(&self.inner);
            let snapshots_ready = snapshots_ready.clone();
            let pull = pull.clone();
            async move {
                snapshots_ready.await?;
                inner.pulls.upsert(&pull)?;
                inner
                    .snapshots
                    .map_to_pulls(&[pull.head.clone(), pull.base.clone()])?;
                Ok::<(), PipelineError>(())
            }
        };

        let mine_clones = {
            let inner = Arc::clone(&self.inner);
            let snapshots_ready = snapshots_ready.clone();
            let project = project.clone();
            async move {
                let head = snapshots_ready.await?;
                let candidates =
                    inner
                        .pulls
                        .find_candidate_sources(project.id, &updated_at, pull_number)?;

                let config = DetectorConfig {
                    min_clone_length: project
                        .min_clone_length
                        .unwrap_or(inner.default_min_clone_length),
                };

                let target_files = inner.loader.load_files(&head, &inner.filter).await?;
                let target_stream =
                    stream::iter(target_files.into_iter().map(Ok::<_, LoadError>)).boxed();

                // Candidate heads load lazily, one pull at a time, as the
                // detector consumes the stream.
                let loader = inner.loader.clone();
                let filter = inner.filter.clone();
                let source_stream = stream::iter(candidates)
                    .then(move |snapshot| {
                        let loader = loader.clone();
                        let filter = filter.clone();
                        async move { loader.load_files(&snapshot, &filter).await }
                    })
                    .map_ok(|files| stream::iter(files.into_iter().map(Ok::<_, LoadError>)))
                    .try_flatten()
                    .boxed();

                let pairs = inner
                    .detector
                    .find_clones(target_stream, source_stream, &config)
                    .await?;
                let records: Vec<CloneRecord> = pairs
                    .iter()
                    .map(|(target, source)| CloneRecord::between(target, source))
                    .collect();
                let saved = inner.clones.save_all(records)?;
                Ok::<usize, PipelineError>(saved.len())
            }
        };

        let (updated, mined) = tokio::join!(update_pull, mine_clones);
        updated?;
        let clones = mined?;
        Ok(Outcome::Completed { clones })
    }

    /// Hand the event to a background task and return immediately.
    ///
    /// The task runs to completion regardless of the caller; completion and
    /// failure are reported to the log rather than the submitter.
    pub fn submit(&self, payload: WebhookPayload) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let repo = format!(
                "{}/{}",
                payload.repository.owner.login, payload.repository.name
            );
            let number = payload.pull_request.number;
            match pipeline.process(&payload).await {
                Ok(Outcome::Completed { clones }) => {
                    log::info!("processed pull #{number} of {repo}: {clones} clone(s) recorded");
                }
                Ok(Outcome::UntrackedProject) => {}
                Err(e) => log::error!("pipeline failed for pull #{number} of {repo}: {e}"),
            }
        });
    }
}
