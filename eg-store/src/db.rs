use crate::error::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sentences (
    id               INTEGER PRIMARY KEY,
    english_sentence TEXT NOT NULL,
    korean_sentence  TEXT,
    difficulty       INTEGER NOT NULL DEFAULT 1,
    source           TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS submissions (
    id                 TEXT PRIMARY KEY,
    user_id            TEXT,
    sentence_id        INTEGER NOT NULL,
    user_answer        TEXT NOT NULL,
    korean_sentence    TEXT NOT NULL,
    score              INTEGER NOT NULL,
    corrected_sentence TEXT NOT NULL,
    summary            TEXT NOT NULL,
    items              TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_submissions_user_created
    ON submissions (user_id, created_at DESC);
";

/// Handle to the application database. Connections are opened per operation
/// inside `spawn_blocking`, so async request tasks never hold one across an
/// await point.
#[derive(Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create tables if missing. Run once at startup.
    #[tracing::instrument(level = "info", skip_all, fields(db_path = %self.path.display()))]
    pub async fn init(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
    }

    pub(crate) fn open(path: &Path) -> Result<Connection> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Ok(conn)
    }

    /// Run a closure against a fresh connection on the blocking pool.
    pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::open(&path)?;
            f(&conn)
        })
        .await?
    }
}
