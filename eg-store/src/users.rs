use crate::db::Db;
use crate::error::Result;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct UserStore {
    db: Db,
}

impl UserStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Register a user. A duplicate email surfaces as `StoreError::Conflict`
    /// via the unique constraint.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn create(&self, email: &str, password_hash: &str) -> Result<UserRecord> {
        let email = email.trim().to_ascii_lowercase();
        let password_hash = password_hash.to_string();
        self.db
            .with_conn(move |conn| {
                let id = Uuid::new_v4().to_string();
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO users (id, email, password_hash, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, email, password_hash, now],
                )?;
                Ok(UserRecord {
                    id,
                    email,
                    password_hash,
                    created_at: now,
                })
            })
            .await
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.trim().to_ascii_lowercase();
        self.db
            .with_conn(move |conn| {
                let record = conn
                    .query_row(
                        "SELECT id, email, password_hash, created_at
                         FROM users WHERE email = ?1",
                        params![email],
                        |row| {
                            Ok(UserRecord {
                                id: row.get(0)?,
                                email: row.get(1)?,
                                password_hash: row.get(2)?,
                                created_at: row.get(3)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    async fn store() -> (tempfile::TempDir, UserStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Db::new(dir.path().join("test.db"));
        db.init().await.expect("init");
        (dir, UserStore::new(db))
    }

    #[tokio::test]
    async fn create_then_find_normalizes_email() {
        let (_dir, store) = store().await;
        let created = store.create(" Learner@Example.com ", "hash").await.expect("create");
        assert_eq!(created.email, "learner@example.com");

        let found = store
            .find_by_email("LEARNER@example.com")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (_dir, store) = store().await;
        store.create("learner@example.com", "hash").await.expect("create");
        let err = store
            .create("learner@example.com", "other")
            .await
            .expect_err("must fail");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_email_is_none() {
        let (_dir, store) = store().await;
        assert!(store.find_by_email("missing@example.com").await.expect("find").is_none());
    }
}
