use super::DbConn;
use crate::domain::{CloneRecord, SnapshotId, StoreError};

pub struct CloneRepository {
    conn: DbConn,
}

impl CloneRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Bulk insert detected clones in one transaction, returning the records
    /// with their generated ids. Empty input yields an empty result without
    /// touching the database.
    pub fn save_all(&self, records: Vec<CloneRecord>) -> Result<Vec<CloneRecord>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self
            .conn
            .lock()
            .expect("CloneRepository: failed to acquire database lock");
        let tx = conn.transaction()?;
        let mut saved = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO clones (
                    target_sha, target_repo_id, target_file,
                    target_from_line, target_to_line,
                    source_sha, source_repo_id, source_file,
                    source_from_line, source_to_line
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for mut record in records {
                stmt.execute((
                    &record.target_sha,
                    record.target_repo_id,
                    &record.target_file,
                    record.target_from_line,
                    record.target_to_line,
                    &record.source_sha,
                    record.source_repo_id,
                    &record.source_file,
                    record.source_from_line,
                    record.source_to_line,
                ))?;
                record.id = Some(tx.last_insert_rowid());
                saved.push(record);
            }
        }
        tx.commit()?;
        Ok(saved)
    }

    pub fn find_by_target(&self, target: &SnapshotId) -> Result<Vec<CloneRecord>, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("CloneRepository: failed to acquire database lock");
        let mut stmt = conn.prepare(
            r#"
            SELECT id, target_sha, target_repo_id, target_file,
                   target_from_line, target_to_line,
                   source_sha, source_repo_id, source_file,
                   source_from_line, source_to_line
            FROM clones
            WHERE target_sha = ?1 AND target_repo_id = ?2
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map((&target.sha, target.repo_id), |row| {
            Ok(CloneRecord {
                id: row.get(0)?,
                target_sha: row.get(1)?,
                target_repo_id: row.get(2)?,
                target_file: row.get(3)?,
                target_from_line: row.get(4)?,
                target_to_line: row.get(5)?,
                source_sha: row.get(6)?,
                source_repo_id: row.get(7)?,
                source_file: row.get(8)?,
                source_from_line: row.get(9)?,
                source_to_line: row.get(10)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
