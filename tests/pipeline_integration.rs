//! End-to-end pipeline tests: local git history in, persisted pulls and
//! clones out. Each test skips gracefully when git is unavailable.

use chrono::{TimeZone, Utc};
use clonewatch::application::{ClonePipeline, FileLoader, Outcome};
use clonewatch::detect::LineHashDetector;
use clonewatch::domain::{FileFilter, SnapshotId};
use clonewatch::infra::db::Database;
use clonewatch::infra::git::GitWorkspace;
use clonewatch::infra::github::{ApiCommitRef, ApiPull, ApiRepo, ApiUser, WebhookPayload};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const REPO_ID: i64 = 11;

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn rev_parse(dir: &Path) -> String {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .expect("failed to run git rev-parse");
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn shared_block() -> Vec<String> {
    (1..=6)
        .map(|i| format!("let combo_{i} = rank_{i} + suit_{i};"))
        .collect()
}

/// History with two feature branches: feature-1 adds `util.rs` holding a
/// six-line block at lines 3..=8, feature-2 adds `copied.rs` holding the
/// same block at lines 1..=6.
fn seed_origin(dir: &Path) -> (String, String, String) {
    run_git(dir, &["init"]);
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);

    fs::write(dir.join("README.md"), "# poker\n").unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-m", "init"]);
    let main = rev_parse(dir);

    run_git(dir, &["checkout", "-b", "feature-1"]);
    let util = format!(
        "fn util_one() {{}}\nfn util_two() {{}}\n{}\nfn util_tail() {{}}\n",
        shared_block().join("\n")
    );
    fs::write(dir.join("util.rs"), util).unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-m", "add util"]);
    let feature_1 = rev_parse(dir);

    run_git(dir, &["checkout", "-b", "feature-2", &main]);
    fs::write(dir.join("copied.rs"), format!("{}\n", shared_block().join("\n"))).unwrap();
    run_git(dir, &["add", "."]);
    run_git(dir, &["commit", "-m", "copy the block"]);
    let feature_2 = rev_parse(dir);

    (main, feature_1, feature_2)
}

fn api_user(id: i64, login: &str) -> ApiUser {
    ApiUser {
        id,
        login: login.into(),
        name: None,
        avatar_url: None,
        kind: Some("User".into()),
    }
}

fn api_repo() -> ApiRepo {
    ApiRepo {
        id: REPO_ID,
        name: "poker".into(),
        description: Some("Texas holdem".into()),
        owner: api_user(1, "acme"),
    }
}

fn payload(
    number: i64,
    pull_id: i64,
    head_sha: &str,
    head_branch: &str,
    base_sha: &str,
    updated_minute: u32,
) -> WebhookPayload {
    WebhookPayload {
        action: Some("synchronize".into()),
        repository: api_repo(),
        pull_request: ApiPull {
            id: pull_id,
            number,
            title: Some(format!("pull #{number}")),
            state: Some("open".into()),
            created_at: Utc.with_ymd_and_hms(2020, 5, 1, 10, 0, 0).unwrap(),
            updated_at: Utc
                .with_ymd_and_hms(2020, 5, 2, 11, updated_minute, 0)
                .unwrap(),
            head: ApiCommitRef {
                sha: head_sha.into(),
                branch: head_branch.into(),
                repo: Some(api_repo()),
            },
            base: ApiCommitRef {
                sha: base_sha.into(),
                branch: "main".into(),
                repo: None,
            },
            user: api_user(2, "contributor"),
        },
    }
}

struct Harness {
    _origin: TempDir,
    _workspace_root: TempDir,
    db: Database,
    pipeline: ClonePipeline,
    project_id: i64,
    main: String,
    feature_1: String,
    feature_2: String,
}

fn setup(tracked: bool) -> Option<Harness> {
    if !git_available() {
        return None;
    }
    let origin = TempDir::new().unwrap();
    let (main, feature_1, feature_2) = seed_origin(origin.path());

    let db = Database::open_in_memory().unwrap();
    let project_id = if tracked {
        db.project_repo().insert("acme", "poker", None).unwrap().id
    } else {
        0
    };

    let workspace_root = TempDir::new().unwrap();
    let workspace = GitWorkspace::new(workspace_root.path()).unwrap();
    let origin_url = origin.path().to_string_lossy().into_owned();
    let loader = FileLoader::with_remote_urls(workspace, move |_| origin_url.clone());
    let pipeline = ClonePipeline::new(
        &db,
        loader,
        Box::new(LineHashDetector),
        FileFilter::sources(),
        5,
    );

    Some(Harness {
        _origin: origin,
        _workspace_root: workspace_root,
        db,
        pipeline,
        project_id,
        main,
        feature_1,
        feature_2,
    })
}

#[tokio::test]
async fn detects_clones_between_pulls_and_persists_idempotently() {
    let Some(h) = setup(true) else { return };

    // First pull: no earlier pulls, nothing to mine.
    let first = payload(1, 101, &h.feature_1, "feature-1", &h.main, 0);
    let outcome = h.pipeline.process(&first).await.unwrap();
    assert_eq!(outcome, Outcome::Completed { clones: 0 });

    // Second pull copies the block introduced by the first.
    let second = payload(2, 102, &h.feature_2, "feature-2", &h.main, 30);
    let outcome = h.pipeline.process(&second).await.unwrap();
    assert_eq!(outcome, Outcome::Completed { clones: 1 });

    let target = SnapshotId {
        sha: h.feature_2.clone(),
        repo_id: REPO_ID,
    };
    let clones = h.db.clone_repo().find_by_target(&target).unwrap();
    assert_eq!(clones.len(), 1);
    let clone = &clones[0];
    assert_eq!(clone.target_file, "copied.rs");
    assert_eq!((clone.target_from_line, clone.target_to_line), (1, 6));
    assert_eq!(clone.source_file, "util.rs");
    assert_eq!((clone.source_from_line, clone.source_to_line), (3, 8));
    assert_eq!(clone.source_sha, h.feature_1);

    // Re-delivery: no duplicate pulls, snapshots or associations.
    h.pipeline.process(&second).await.unwrap();
    assert_eq!(h.db.pull_repo().count_for_project(h.project_id).unwrap(), 2);
    assert_eq!(
        h.db.snapshot_repo().pull_association_count(&target).unwrap(),
        1
    );
    let stored = h
        .db
        .pull_repo()
        .find_by_project_and_number(h.project_id, 2)
        .unwrap()
        .unwrap();
    assert_eq!(stored.head.sha, h.feature_2);
    assert_eq!(stored.id, 102);
}

#[tokio::test]
async fn redelivered_earlier_pull_never_mines_later_code() {
    let Some(h) = setup(true) else { return };

    let first = payload(1, 101, &h.feature_1, "feature-1", &h.main, 0);
    let second = payload(2, 102, &h.feature_2, "feature-2", &h.main, 30);
    h.pipeline.process(&first).await.unwrap();
    h.pipeline.process(&second).await.unwrap();

    // Pull 2 arrived later, so a re-delivery for pull 1 must not treat
    // pull 2's head as a source.
    let outcome = h.pipeline.process(&first).await.unwrap();
    assert_eq!(outcome, Outcome::Completed { clones: 0 });

    let target = SnapshotId {
        sha: h.feature_1.clone(),
        repo_id: REPO_ID,
    };
    assert!(h.db.clone_repo().find_by_target(&target).unwrap().is_empty());
}

#[tokio::test]
async fn untracked_repository_is_a_silent_no_op() {
    let Some(h) = setup(false) else { return };

    let event = payload(1, 101, &h.feature_1, "feature-1", &h.main, 0);
    let outcome = h.pipeline.process(&event).await.unwrap();
    assert_eq!(outcome, Outcome::UntrackedProject);

    // Nothing was persisted, not even the head snapshot.
    let head = SnapshotId {
        sha: h.feature_1.clone(),
        repo_id: REPO_ID,
    };
    assert!(h.db.snapshot_repo().find_by_id(&head).unwrap().is_none());
}
