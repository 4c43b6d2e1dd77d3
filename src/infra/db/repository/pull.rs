use super::{DbConn, decode_ts, encode_ts};
use crate::domain::{CommitSnapshot, Pull, RepoRef, StoreError, UserRef};
use chrono::{DateTime, Utc};
use rusqlite::Row;

pub struct PullRepository {
    conn: DbConn,
}

const SNAPSHOT_COLUMNS: usize = 10;

impl PullRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Insert or update a pull, keyed by its (project_id, number) natural
    /// key. A redelivered or newer event for the same pull number replaces
    /// the head/base snapshots, open flag and update time in place; the row
    /// count for the key never grows. The statement is a single conflict-
    /// tolerant upsert, so concurrent deliveries cannot race a
    /// check-then-insert.
    pub fn upsert(&self, pull: &Pull) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("PullRepository: failed to acquire database lock");
        conn.execute(
            r#"
            INSERT INTO pulls (
                project_id, number, id, title, open, created_at, updated_at,
                head_sha, head_repo_id, base_sha, base_repo_id, author_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (project_id, number) DO UPDATE SET
                id = excluded.id,
                title = excluded.title,
                open = excluded.open,
                updated_at = excluded.updated_at,
                head_sha = excluded.head_sha,
                head_repo_id = excluded.head_repo_id,
                base_sha = excluded.base_sha,
                base_repo_id = excluded.base_repo_id,
                author_id = excluded.author_id
            "#,
            (
                pull.project_id,
                pull.number,
                pull.id,
                &pull.title,
                pull.open as i32,
                encode_ts(&pull.created_at),
                encode_ts(&pull.updated_at),
                &pull.head.sha,
                pull.head.repo.id,
                &pull.base.sha,
                pull.base.repo.id,
                pull.author.id,
            ),
        )?;
        Ok(())
    }

    pub fn find_by_project_and_number(
        &self,
        project_id: i64,
        number: i64,
    ) -> Result<Option<Pull>, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("PullRepository: failed to acquire database lock");
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT p.id, p.number, p.title, p.open, p.created_at, p.updated_at, p.project_id,
                   {head}, {base}, {author}
            FROM pulls p
            JOIN commit_snapshots hs ON hs.sha = p.head_sha AND hs.repo_id = p.head_repo_id
            JOIN repos hr ON hr.id = p.head_repo_id
            JOIN users hu ON hu.id = hr.owner_id
            JOIN commit_snapshots bs ON bs.sha = p.base_sha AND bs.repo_id = p.base_repo_id
            JOIN repos br ON br.id = p.base_repo_id
            JOIN users bu ON bu.id = br.owner_id
            JOIN users au ON au.id = p.author_id
            WHERE p.project_id = ?1 AND p.number = ?2
            "#,
            head = snapshot_columns("hs", "hr", "hu"),
            base = snapshot_columns("bs", "br", "bu"),
            author = user_columns("au"),
        ))?;
        let mut rows = stmt.query((project_id, number))?;
        if let Some(row) = rows.next()? {
            Ok(Some(read_pull(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn count_for_project(&self, project_id: i64) -> Result<usize, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("PullRepository: failed to acquire database lock");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pulls WHERE project_id = ?1",
            [project_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Head snapshots of every other pull in the project updated strictly
    /// before `updated_before`. Only code that already existed before the
    /// triggering update may act as a clone source.
    pub fn find_candidate_sources(
        &self,
        project_id: i64,
        updated_before: &DateTime<Utc>,
        excluding_number: i64,
    ) -> Result<Vec<CommitSnapshot>, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("PullRepository: failed to acquire database lock");
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {head}, p.id
            FROM pulls p
            JOIN commit_snapshots hs ON hs.sha = p.head_sha AND hs.repo_id = p.head_repo_id
            JOIN repos hr ON hr.id = p.head_repo_id
            JOIN users hu ON hu.id = hr.owner_id
            WHERE p.project_id = ?1 AND p.updated_at < ?2 AND p.number <> ?3
            ORDER BY p.updated_at
            "#,
            head = snapshot_columns("hs", "hr", "hu"),
        ))?;
        let rows = stmt.query_map(
            (project_id, encode_ts(updated_before), excluding_number),
            |row| {
                let pull_id: i64 = row.get(SNAPSHOT_COLUMNS)?;
                read_snapshot(row, 0, Some(pull_id))
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn snapshot_columns(snap: &str, repo: &str, owner: &str) -> String {
    format!(
        "{snap}.sha, {snap}.branch, {repo}.id, {repo}.name, {repo}.description, {owner_cols}",
        owner_cols = user_columns(owner),
    )
}

fn user_columns(alias: &str) -> String {
    format!(
        "{alias}.id, {alias}.login, {alias}.name, {alias}.avatar_url, {alias}.is_organization"
    )
}

fn read_user(row: &Row<'_>, base: usize) -> rusqlite::Result<UserRef> {
    Ok(UserRef {
        id: row.get(base)?,
        login: row.get(base + 1)?,
        name: row.get(base + 2)?,
        avatar_url: row.get(base + 3)?,
        is_organization: row.get::<_, i32>(base + 4)? != 0,
    })
}

fn read_snapshot(
    row: &Row<'_>,
    base: usize,
    pull_id: Option<i64>,
) -> rusqlite::Result<CommitSnapshot> {
    Ok(CommitSnapshot {
        sha: row.get(base)?,
        branch: row.get(base + 1)?,
        repo: RepoRef {
            id: row.get(base + 2)?,
            name: row.get(base + 3)?,
            description: row.get(base + 4)?,
            owner: read_user(row, base + 5)?,
        },
        pull_id,
    })
}

fn read_pull(row: &Row<'_>) -> rusqlite::Result<Pull> {
    let id: i64 = row.get(0)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Pull {
        id,
        number: row.get(1)?,
        title: row.get(2)?,
        open: row.get::<_, i32>(3)? != 0,
        created_at: decode_ts(4, &created_at)?,
        updated_at: decode_ts(5, &updated_at)?,
        project_id: row.get(6)?,
        head: read_snapshot(row, 7, Some(id))?,
        base: read_snapshot(row, 7 + SNAPSHOT_COLUMNS, Some(id))?,
        author: read_user(row, 7 + 2 * SNAPSHOT_COLUMNS)?,
    })
}
