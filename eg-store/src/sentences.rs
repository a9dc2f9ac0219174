use crate::db::Db;
use crate::error::{Result, StoreError};
use rusqlite::{Row, params, params_from_iter};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRow {
    pub id: i64,
    pub english_sentence: String,
    pub korean_sentence: Option<String>,
    pub difficulty: i64,
    pub source: String,
}

/// Read side of the practice-sentence catalog, plus the one write this core
/// performs: backfilling Korean translations.
#[derive(Clone)]
pub struct SentenceStore {
    db: Db,
}

impl SentenceStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Sentences that already have a Korean translation, starting past
    /// `offset`. This is the question feed for the practice page.
    #[tracing::instrument(level = "debug", skip_all, fields(offset, limit))]
    pub async fn fresh_questions(&self, offset: i64, limit: u32) -> Result<Vec<SentenceRow>> {
        self.db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, english_sentence, korean_sentence, difficulty, source
                     FROM sentences
                     WHERE korean_sentence IS NOT NULL AND id > ?1
                     ORDER BY id
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![offset, limit], row_to_sentence)?
                    .collect::<std::result::Result<_, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Paged catalog listing for the admin translation table.
    #[tracing::instrument(level = "debug", skip_all, fields(page, page_size))]
    pub async fn list(&self, page: u32, page_size: u32) -> Result<(Vec<SentenceRow>, u64)> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);
        self.db
            .with_conn(move |conn| {
                // Widen before multiplying: page is client-supplied and the
                // product can exceed u32.
                let offset = i64::from(page - 1) * i64::from(page_size);
                let mut stmt = conn.prepare(
                    "SELECT id, english_sentence, korean_sentence, difficulty, source
                     FROM sentences ORDER BY id LIMIT ?1 OFFSET ?2",
                )?;
                let rows = stmt
                    .query_map(params![page_size, offset], row_to_sentence)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let total: u64 =
                    conn.query_row("SELECT COUNT(*) FROM sentences", [], |row| row.get(0))?;
                Ok((rows, total))
            })
            .await
    }

    #[tracing::instrument(level = "debug", skip_all, fields(id_count = ids.len()))]
    pub async fn by_ids(&self, ids: &[i64]) -> Result<Vec<SentenceRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        self.db
            .with_conn(move |conn| {
                let placeholders = vec!["?"; ids.len()].join(", ");
                let sql = format!(
                    "SELECT id, english_sentence, korean_sentence, difficulty, source
                     FROM sentences WHERE id IN ({placeholders}) ORDER BY id"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(ids.iter()), row_to_sentence)?
                    .collect::<std::result::Result<_, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Write back a Korean translation for one sentence.
    #[tracing::instrument(level = "debug", skip_all, fields(id))]
    pub async fn set_korean(&self, id: i64, korean: &str) -> Result<()> {
        let korean = korean.to_string();
        self.db
            .with_conn(move |conn| {
                let changed = conn.execute(
                    "UPDATE sentences SET korean_sentence = ?1 WHERE id = ?2",
                    params![korean, id],
                )?;
                if changed == 0 {
                    return Err(StoreError::NotFound(format!("sentence {id}")));
                }
                Ok(())
            })
            .await
    }

    /// Add a sentence to the catalog. Returns the assigned id.
    pub async fn insert(
        &self,
        english: &str,
        korean: Option<&str>,
        difficulty: i64,
        source: &str,
    ) -> Result<i64> {
        let english = english.to_string();
        let korean = korean.map(str::to_string);
        let source = source.to_string();
        self.db
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO sentences (english_sentence, korean_sentence, difficulty, source)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![english, korean, difficulty, source],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }
}

fn row_to_sentence(row: &Row<'_>) -> rusqlite::Result<SentenceRow> {
    Ok(SentenceRow {
        id: row.get(0)?,
        english_sentence: row.get(1)?,
        korean_sentence: row.get(2)?,
        difficulty: row.get(3)?,
        source: row.get(4)?,
    })
}
