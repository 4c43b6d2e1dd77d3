//! SQLite database setup and connection management for clonewatch.
//! Handles database initialization, schema creation, and connection management.

use anyhow::Result;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::infra::db::repository::{
    CloneRepository, ProjectRepository, PullRepository, RepoRepository, SnapshotRepository,
    UserRepository,
};

/// Database wrapper that manages SQLite connections
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Create or open the database at the default location
    pub fn open() -> Result<Self> {
        let path = Self::default_path();
        Self::open_at(path)
    }

    /// Create an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init()?;
        Ok(db)
    }

    /// Create or open the database at a specific path
    pub fn open_at(path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init()?;
        Ok(db)
    }

    /// Get the default database path
    fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("CLONEWATCH_DB_PATH") {
            return PathBuf::from(path);
        }

        #[cfg(target_os = "macos")]
        {
            if let Some(home) = home::home_dir() {
                return home
                    .join("Library")
                    .join("Application Support")
                    .join("clonewatch")
                    .join("db.sqlite");
            }
        }

        #[cfg(target_os = "linux")]
        {
            if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
                return PathBuf::from(xdg).join("clonewatch").join("db.sqlite");
            }
            if let Some(home) = home::home_dir() {
                return home
                    .join(".local")
                    .join("share")
                    .join("clonewatch")
                    .join("db.sqlite");
            }
        }

        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".clonewatch")
            .join("db.sqlite")
    }

    /// Initialize database schema
    fn init(&self) -> Result<()> {
        let conn = self.conn.lock().expect("Database: poisoned connection lock");
        const SCHEMA_VERSION: i32 = 1;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let existing_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if existing_version == 0 {
            Self::create_schema(&conn)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        } else if existing_version < SCHEMA_VERSION {
            for version in (existing_version + 1)..=SCHEMA_VERSION {
                Self::run_migration(&conn, version)?;
            }
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                login TEXT NOT NULL,
                name TEXT,
                avatar_url TEXT,
                is_organization INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS repos (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                owner_id INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repo_owner TEXT NOT NULL,
                repo_name TEXT NOT NULL,
                min_clone_length INTEGER,
                UNIQUE (repo_owner, repo_name)
            );

            CREATE TABLE IF NOT EXISTS commit_snapshots (
                sha TEXT NOT NULL,
                repo_id INTEGER NOT NULL REFERENCES repos(id),
                branch TEXT NOT NULL,
                PRIMARY KEY (sha, repo_id)
            );

            CREATE TABLE IF NOT EXISTS snapshot_pulls (
                sha TEXT NOT NULL,
                repo_id INTEGER NOT NULL,
                pull_id INTEGER NOT NULL,
                PRIMARY KEY (sha, repo_id, pull_id),
                FOREIGN KEY (sha, repo_id) REFERENCES commit_snapshots(sha, repo_id)
            );

            CREATE TABLE IF NOT EXISTS pulls (
                project_id INTEGER NOT NULL REFERENCES projects(id),
                number INTEGER NOT NULL,
                id INTEGER NOT NULL,
                title TEXT NOT NULL,
                open INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                head_sha TEXT NOT NULL,
                head_repo_id INTEGER NOT NULL,
                base_sha TEXT NOT NULL,
                base_repo_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id),
                PRIMARY KEY (project_id, number),
                FOREIGN KEY (head_sha, head_repo_id) REFERENCES commit_snapshots(sha, repo_id),
                FOREIGN KEY (base_sha, base_repo_id) REFERENCES commit_snapshots(sha, repo_id)
            );

            CREATE INDEX IF NOT EXISTS idx_pulls_project_updated
                ON pulls(project_id, updated_at);

            CREATE TABLE IF NOT EXISTS clones (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                target_sha TEXT NOT NULL,
                target_repo_id INTEGER NOT NULL,
                target_file TEXT NOT NULL,
                target_from_line INTEGER NOT NULL,
                target_to_line INTEGER NOT NULL,
                source_sha TEXT NOT NULL,
                source_repo_id INTEGER NOT NULL,
                source_file TEXT NOT NULL,
                source_from_line INTEGER NOT NULL,
                source_to_line INTEGER NOT NULL,
                FOREIGN KEY (target_sha, target_repo_id) REFERENCES commit_snapshots(sha, repo_id),
                FOREIGN KEY (source_sha, source_repo_id) REFERENCES commit_snapshots(sha, repo_id)
            );

            CREATE INDEX IF NOT EXISTS idx_clones_target
                ON clones(target_sha, target_repo_id);
            "#,
        )?;
        Ok(())
    }

    fn run_migration(_conn: &Connection, version: i32) -> Result<()> {
        anyhow::bail!("no migration registered for schema version {version}")
    }

    /// Get a reference to the connection
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn user_repo(&self) -> UserRepository {
        UserRepository::new(self.connection())
    }

    pub fn repo_repo(&self) -> RepoRepository {
        RepoRepository::new(self.connection())
    }

    pub fn project_repo(&self) -> ProjectRepository {
        ProjectRepository::new(self.connection())
    }

    pub fn snapshot_repo(&self) -> SnapshotRepository {
        SnapshotRepository::new(self.connection())
    }

    pub fn pull_repo(&self) -> PullRepository {
        PullRepository::new(self.connection())
    }

    pub fn clone_repo(&self) -> CloneRepository {
        CloneRepository::new(self.connection())
    }
}
