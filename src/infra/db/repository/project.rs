use super::DbConn;
use crate::domain::{Project, StoreError};

pub struct ProjectRepository {
    conn: DbConn,
}

impl ProjectRepository {
    pub fn new(conn: DbConn) -> Self {
        Self { conn }
    }

    pub fn insert(
        &self,
        repo_owner: &str,
        repo_name: &str,
        min_clone_length: Option<usize>,
    ) -> Result<Project, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("ProjectRepository: failed to acquire database lock");
        conn.execute(
            "INSERT INTO projects (repo_owner, repo_name, min_clone_length) VALUES (?1, ?2, ?3)",
            (repo_owner, repo_name, min_clone_length.map(|n| n as i64)),
        )?;
        Ok(Project {
            id: conn.last_insert_rowid(),
            repo_owner: repo_owner.to_string(),
            repo_name: repo_name.to_string(),
            min_clone_length,
        })
    }

    pub fn find_by_repo(&self, owner: &str, name: &str) -> Result<Option<Project>, StoreError> {
        let conn = self
            .conn
            .lock()
            .expect("ProjectRepository: failed to acquire database lock");
        let mut stmt = conn.prepare(
            "SELECT id, repo_owner, repo_name, min_clone_length
             FROM projects WHERE repo_owner = ?1 AND repo_name = ?2",
        )?;
        let mut rows = stmt.query((owner, name))?;
        if let Some(row) = rows.next()? {
            Ok(Some(Project {
                id: row.get(0)?,
                repo_owner: row.get(1)?,
                repo_name: row.get(2)?,
                min_clone_length: row.get::<_, Option<i64>>(3)?.map(|n| n as usize),
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
    fn duplicate_project_registration_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        let projects = db.project_repo();

        projects.insert("acme", "poker", None).unwrap();
        let err = projects.insert("acme", "poker", Some(10)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn lookup_by_repo_owner_and_name() {
        let db = Database::open_in_memory().unwrap();
        let projects = db.project_repo();

        let created = projects.insert("acme", "poker", Some(8)).unwrap();
        let found = projects.find_by_repo("acme", "poker").unwrap().unwrap();
        assert_eq!(found, created);
        assert!(projects.find_by_repo("acme", "chess").unwrap().is_none());
    }
}
