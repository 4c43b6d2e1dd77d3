use super::DbConn;
use crate::domain::{StoreError, UserRef};

pub struct UserRepository {
    conn: DbConn,
}

impl UserRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    /// Insert or refresh a provider account. Login, display name and avatar
    /// may change between events; the id never does.
    pub fn upsert(&self, user: &UserRef) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("UserRepository: failed to acquire database lock");
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
                user.id,
                &user.login,
                &user.name,
                &user.avatar_url,
                user.is_organization as i32,
            ),
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<UserRef>, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("UserRepository: failed to acquire database lock");
        let mut stmt = conn.prepare(
            "SELECT id, login, name, avatar_url, is_organization FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(UserRef {
                id: row.get(0)?,
                login: row.get(1)?,
                name: row.get(2)?,
                avatar_url: row.get(3)?,
                is_organization: row.get::<_, i32>(4)? != 0,
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

    fn sample_user() -> UserRef {
        UserRef {
            id: 7,
            login: "octocat".into(),
            name: Some("The Octocat".into()),
            avatar_url: None,
            is_organization: false,
        }
    }

    #[test]
    fn upsert_refreshes_mutable_fields() {
        let db = Database::open_in_memory().unwrap();
        let repo = db.user_repo();

        let mut user = sample_user();
        repo.upsert(&user).unwrap();

        user.login = "octocat-renamed".into();
        repo.upsert(&user).unwrap();

        let found = repo.find_by_id(7).unwrap().unwrap();
        assert_eq!(found.login, "octocat-renamed");
    }
}
