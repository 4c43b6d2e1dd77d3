use super::DbConn;
use crate::domain::{RepoRef, StoreError, UserRef};

pub struct RepoRepository {
    conn: DbConn,
}

impl RepoRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Insert or refresh a repository together with its owner row.
    /// Description may change between re-fetched snapshots.
    pub fn upsert(&self, repo: &RepoRef) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("RepoRepository: failed to acquire database lock");
        conn.execute(
            r#"
            INSERT INTO users (id, login, name, avatar_url, is_organization)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (id) DO UPDATE SET
                login = excluded.login,
                name = excluded.name,
                avatar_url = excluded.avatar_url,
                is_organization = excluded.is_organization
            "#,
            (
                repo.owner.id,
                &repo.owner.login,
                &repo.owner.name,
                &repo.owner.avatar_url,
                repo.owner.is_organization as i32,
            ),
        )?;
        conn.execute(
            r#"
            INSERT INTO repos (id, name, description, owner_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                owner_id = excluded.owner_id
            "#,
            (repo.id, &repo.name, &repo.description, repo.owner.id),
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<RepoRef>, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("RepoRepository: failed to acquire database lock");
        let mut stmt = conn.prepare(
            r#"
            SELECT r.id, r.name, r.description,
                   u.id, u.login, u.name, u.avatar_url, u.is_organization
            FROM repos r
            JOIN users u ON u.id = r.owner_id
            WHERE r.id = ?1
            "#,
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(RepoRef {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                owner: UserRef {
                    id: row.get(3)?,
                    login: row.get(4)?,
                    name: row.get(5)?,
                    avatar_url: row.get(6)?,
                    is_organization: row.get::<_, i32>(7)? != 0,
                },
            }))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::db::Database;

    #[test]
    fn upsert_updates_description() {
        let db = Database::open_in_memory().unwrap();
        let repos = db.repo_repo();

        let mut repo = RepoRef {
            id: 11,
            name: "poker".into(),
            description: "".into(),
            owner: UserRef {
                id: 1,
                login: "acme".into(),
                name: None,
                avatar_url: None,
                is_organization: true,
            },
        };
        repos.upsert(&repo).unwrap();

        repo.description = "Texas holdem".into();
        repos.upsert(&repo).unwrap();

        let found = repos.find_by_id(11).unwrap().unwrap();
        assert_eq!(found.description, "Texas holdem");
        assert_eq!(found.owner.login, "acme");
    }
}
