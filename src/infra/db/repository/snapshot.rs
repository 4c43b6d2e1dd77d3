use super::DbConn;
use crate::domain::{CommitSnapshot, RepoRef, SnapshotId, StoreError, UserRef};

/// Batched, idempotent persistence of commit snapshots and their
/// snapshot↔pull associations.
pub struct SnapshotRepository {
    conn: DbConn,
}

impl SnapshotRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Bulk insert keyed by (sha, repo_id); rows that already exist are
    /// ignored. Empty input is a no-op success.
    pub fn insert_all(&self, snapshots: &[CommitSnapshot]) -> Result<(), StoreError> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let mut conn = self
            .conn
            .lock()
            .expect("SnapshotRepository: failed to acquire database lock");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO commit_snapshots (sha, repo_id, branch)
                 VALUES (?1, ?2, ?3)",
            )?;
            for snapshot in snapshots {
                stmt.execute((&snapshot.sha, snapshot.repo.id, &snapshot.branch))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Bulk insert of snapshot↔pull associations keyed by
    /// (sha, repo_id, pull_id).
    ///
    /// If any element of the batch carries no pull id the whole call is a
    /// no-op success rather than a partial insert.
    pub fn map_to_pulls(&self, snapshots: &[CommitSnapshot]) -> Result<(), StoreError> {
        if snapshots.is_empty() || snapshots.iter().any(|s| s.pull_id.is_none()) {
            return Ok(());
        }
        let mut conn = self
            .conn
            .lock()
            .expect("SnapshotRepository: failed to acquire database lock");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO snapshot_pulls (sha, repo_id, pull_id)
                 VALUES (?1, ?2, ?3)",
            )?;
            for snapshot in snapshots {
                stmt.execute((&snapshot.sha, snapshot.repo.id, snapshot.pull_id))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn find_by_id(&self, id: &SnapshotId) -> Result<Option<CommitSnapshot>, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("SnapshotRepository: failed to acquire database lock");
        let mut stmt = conn.prepare(
            r#"
            SELECT snap.sha, snap.branch,
                   r.id, r.name, r.description,
                   u.id, u.login, u.name, u.avatar_url, u.is_organization
            FROM commit_snapshots snap
            JOIN repos r ON r.id = snap.repo_id
            JOIN users u ON u.id = r.owner_id
            WHERE snap.sha = ?1 AND snap.repo_id = ?2
            "#,
        )?;
        let mut rows = stmt.query((&id.sha, id.repo_id))?;
        if let Some(row) = rows.next()? {
            Ok(Some(CommitSnapshot {
                sha: row.get(0)?,
                branch: row.get(1)?,
                repo: RepoRef {
                    id: row.get(2)?,
                    name: row.get(3)?,
                    description: row.get(4)?,
                    owner: UserRef {
                        id: row.get(5)?,
                        login: row.get(6)?,
                        name: row.get(7)?,
                        avatar_url: row.get(8)?,
                        is_organization: row.get::<_, i32>(9)? != 0,
                    },
                },
                pull_id: None,
            }))
        } else {
            Ok(None)
        }
    }

    /// Number of association rows for one snapshot. Used by idempotence
    /// checks.
    pub fn pull_association_count(&self, id: &SnapshotId) -> Result<usize, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("SnapshotRepository: failed to acquire database lock");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM snapshot_pulls WHERE sha = ?1 AND repo_id = ?2",
            (&id.sha, id.repo_id),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::db::Database;

    fn snapshot(sha: &str, pull_id: Option<i64>) -> CommitSnapshot {
        CommitSnapshot {
            sha: sha.into(),
            repo: RepoRef {
                id: 11,
                name: "poker".into(),
                description: "".into(),
                owner: UserRef {
                    id: 1,
                    login: "acme".into(),
                    name: None,
                    avatar_url: None,
                    is_organization: false,
                },
            },
            branch: "develop".into(),
            pull_id,
        }
    }

    fn db_with_repo() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.repo_repo().upsert(&snapshot("x", None).repo).unwrap();
        db
    }

    #[test]
    fn duplicate_snapshot_insert_is_a_no_op() {
        let db = db_with_repo();
        let snapshots = db.snapshot_repo();

        let snap = snapshot("a1", None);
        snapshots.insert_all(std::slice::from_ref(&snap)).unwrap();
        snapshots.insert_all(&[snap.clone(), snap.clone()]).unwrap();

        assert!(snapshots.find_by_id(&snap.id()).unwrap().is_some());
    }

    #[test]
    fn empty_batch_is_a_no_op_success() {
        let db = db_with_repo();
        db.snapshot_repo().insert_all(&[]).unwrap();
        db.snapshot_repo().map_to_pulls(&[]).unwrap();
    }

    #[test]
    fn association_batch_with_any_missing_pull_id_is_skipped_entirely() {
        let db = db_with_repo();
        let snapshots = db.snapshot_repo();

        let with_pull = snapshot("a1", Some(500));
        let without_pull = snapshot("b2", None);
        snapshots
            .insert_all(&[with_pull.clone(), without_pull.clone()])
            .unwrap();

        snapshots
            .map_to_pulls(&[with_pull.clone(), without_pull])
            .unwrap();
        assert_eq!(snapshots.pull_association_count(&with_pull.id()).unwrap(), 0);

        snapshots.map_to_pulls(std::slice::from_ref(&with_pull)).unwrap();
        snapshots.map_to_pulls(std::slice::from_ref(&with_pull)).unwrap();
        assert_eq!(snapshots.pull_association_count(&with_pull.id()).unwrap(), 1);
    }
}
