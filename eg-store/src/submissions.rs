use crate::db::Db;
use crate::error::Result;
use chrono::Utc;
use rusqlite::{Connection, Row, params};
use serde::Serialize;
use uuid::Uuid;

/// How many of the latest scores feed the recent average, and the minimum
/// sample count before it is reported at all.
pub const RECENT_WINDOW: usize = 30;

/// Submission to record. The store generates the id and timestamps itself.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    /// None for anonymous submissions; not an error case.
    pub user_id: Option<String>,
    pub sentence_id: i64,
    pub user_answer: String,
    pub korean_sentence: String,
    pub score: i64,
    pub corrected_sentence: String,
    pub summary: String,
    /// Feedback items, already serialized as JSON text.
    pub items_json: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRow {
    pub id: String,
    pub user_id: Option<String>,
    pub sentence_id: i64,
    pub user_answer: String,
    pub korean_sentence: String,
    pub score: i64,
    pub corrected_sentence: String,
    pub summary: String,
    pub items: serde_json::Value,
    pub created_at: String,
}

/// Aggregate score statistics for one user. `recent_average` stays `None`
/// until the user has at least [`RECENT_WINDOW`] submissions, so callers can
/// tell "not enough data" apart from an average of zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_count: u64,
    pub average_score: i64,
    pub max_score: i64,
    pub min_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_average: Option<i64>,
}

impl UserStats {
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            average_score: 0,
            max_score: 0,
            min_score: 0,
            recent_average: None,
        }
    }
}

/// Append-only store of evaluation events. Duplicate submissions for the same
/// sentence are expected; each row is an audit record, never an upsert target.
#[derive(Clone)]
pub struct SubmissionStore {
    db: Db,
}

impl SubmissionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(sentence_id = new.sentence_id))]
    pub async fn insert(&self, new: NewSubmission) -> Result<SubmissionRow> {
        self.db
            .with_conn(move |conn| {
                let id = Uuid::new_v4().to_string();
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO submissions
                     (id, user_id, sentence_id, user_answer, korean_sentence,
                      score, corrected_sentence, summary, items, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                    params![
                        id,
                        new.user_id,
                        new.sentence_id,
                        new.user_answer,
                        new.korean_sentence,
                        new.score,
                        new.corrected_sentence,
                        new.summary,
                        new.items_json,
                        now,
                    ],
                )?;
                Ok(SubmissionRow {
                    id,
                    user_id: new.user_id,
                    sentence_id: new.sentence_id,
                    user_answer: new.user_answer,
                    korean_sentence: new.korean_sentence,
                    score: new.score,
                    corrected_sentence: new.corrected_sentence,
                    summary: new.summary,
                    items: serde_json::from_str(&new.items_json)
                        .unwrap_or(serde_json::Value::Null),
                    created_at: now,
                })
            })
            .await
    }

    /// One page of a user's history, newest first, plus the unfiltered total
    /// for page-count math.
    #[tracing::instrument(level = "debug", skip_all, fields(page, page_size))]
    pub async fn query(
        &self,
        user_id: &str,
        page: u32,
        page_size: u32,
        sentence_id: Option<i64>,
    ) -> Result<(Vec<SubmissionRow>, u64)> {
        let user_id = user_id.to_string();
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);
        self.db
            .with_conn(move |conn| {
                // Widen before multiplying: page is client-supplied and the
                // product can exceed u32.
                let offset = i64::from(page - 1) * i64::from(page_size);
                let (rows, total) = match sentence_id {
                    Some(sid) => {
                        let rows = select_rows(
                            conn,
                            "SELECT id, user_id, sentence_id, user_answer, korean_sentence,
                                    score, corrected_sentence, summary, items, created_at
                             FROM submissions
                             WHERE user_id = ?1 AND sentence_id = ?2
                             ORDER BY created_at DESC, rowid DESC
                             LIMIT ?3 OFFSET ?4",
                            params![user_id, sid, page_size, offset],
                        )?;
                        let total: u64 = conn.query_row(
                            "SELECT COUNT(*) FROM submissions WHERE user_id = ?1 AND sentence_id = ?2",
                            params![user_id, sid],
                            |row| row.get(0),
                        )?;
                        (rows, total)
                    }
                    None => {
                        let rows = select_rows(
                            conn,
                            "SELECT id, user_id, sentence_id, user_answer, korean_sentence,
                                    score, corrected_sentence, summary, items, created_at
                             FROM submissions
                             WHERE user_id = ?1
                             ORDER BY created_at DESC, rowid DESC
                             LIMIT ?2 OFFSET ?3",
                            params![user_id, page_size, offset],
                        )?;
                        let total: u64 = conn.query_row(
                            "SELECT COUNT(*) FROM submissions WHERE user_id = ?1",
                            params![user_id],
                            |row| row.get(0),
                        )?;
                        (rows, total)
                    }
                };
                Ok((rows, total))
            })
            .await
    }

    /// Count/average/max/min over all of a user's scores, plus the average of
    /// the most recent [`RECENT_WINDOW`]. Zero submissions yield zeroed stats,
    /// not an error.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn stats(&self, user_id: &str) -> Result<UserStats> {
        let user_id = user_id.to_string();
        self.db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT score FROM submissions
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC",
                )?;
                let scores: Vec<i64> = stmt
                    .query_map(params![user_id], |row| row.get(0))?
                    .collect::<std::result::Result<_, _>>()?;

                if scores.is_empty() {
                    return Ok(UserStats::empty());
                }

                let recent_average = if scores.len() >= RECENT_WINDOW {
                    Some(round_half_up_average(&scores[..RECENT_WINDOW]))
                } else {
                    None
                };
                Ok(UserStats {
                    total_count: scores.len() as u64,
                    average_score: round_half_up_average(&scores),
                    max_score: scores.iter().copied().max().unwrap_or(0),
                    min_score: scores.iter().copied().min().unwrap_or(0),
                    recent_average,
                })
            })
            .await
    }
}

fn select_rows(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<SubmissionRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, row_to_submission)?
        .collect::<std::result::Result<_, _>>()?;
    Ok(rows)
}

fn row_to_submission(row: &Row<'_>) -> rusqlite::Result<SubmissionRow> {
    let items_text: String = row.get(8)?;
    Ok(SubmissionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        sentence_id: row.get(2)?,
        user_answer: row.get(3)?,
        korean_sentence: row.get(4)?,
        score: row.get(5)?,
        corrected_sentence: row.get(6)?,
        summary: row.get(7)?,
        items: serde_json::from_str(&items_text).unwrap_or(serde_json::Value::Null),
        created_at: row.get(9)?,
    })
}

fn round_half_up_average(scores: &[i64]) -> i64 {
    if scores.is_empty() {
        return 0;
    }
    let sum: i64 = scores.iter().sum();
    (sum as f64 / scores.len() as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, SubmissionStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Db::new(dir.path().join("test.db"));
        db.init().await.expect("init");
        (dir, SubmissionStore::new(db))
    }

    fn submission(user_id: Option<&str>, sentence_id: i64, score: i64) -> NewSubmission {
        NewSubmission {
            user_id: user_id.map(str::to_string),
            sentence_id,
            user_answer: "I drink coffee this morning.".to_string(),
            korean_sentence: "나는 오늘 아침에 커피를 마셨다.".to_string(),
            score,
            corrected_sentence: "I drank coffee this morning.".to_string(),
            summary: "시제만 다듬으면 완벽해요!".to_string(),
            items_json: r#"[{"type":"Suggestion","original":"drink","comment":"과거형"}]"#.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_generates_distinct_ids_for_duplicate_submissions() {
        let (_dir, store) = store().await;
        let a = store.insert(submission(Some("u1"), 7, 70)).await.expect("insert");
        let b = store.insert(submission(Some("u1"), 7, 70)).await.expect("insert");
        assert_ne!(a.id, b.id);
        let (_, total) = store.query("u1", 1, 20, None).await.expect("query");
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn insert_accepts_anonymous_submissions() {
        let (_dir, store) = store().await;
        let row = store.insert(submission(None, 7, 70)).await.expect("insert");
        assert!(row.user_id.is_none());
        assert_eq!(row.score, 70);
    }

    #[tokio::test]
    async fn query_paginates_newest_first() {
        let (_dir, store) = store().await;
        for i in 0..5 {
            store
                .insert(submission(Some("u1"), i, 50 + i))
                .await
                .expect("insert");
        }
        let (rows, total) = store.query("u1", 1, 2, None).await.expect("page 1");
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 2);
        // Newest insert (sentence_id 4) comes back first.
        assert_eq!(rows[0].sentence_id, 4);

        let (rows, _) = store.query("u1", 3, 2, None).await.expect("page 3");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sentence_id, 0);
    }

    #[tokio::test]
    async fn query_far_past_the_last_page_is_empty_not_an_error() {
        let (_dir, store) = store().await;
        store.insert(submission(Some("u1"), 1, 60)).await.expect("insert");
        let (rows, total) = store.query("u1", u32::MAX, 100, None).await.expect("query");
        assert!(rows.is_empty());
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn query_filters_by_sentence_id() {
        let (_dir, store) = store().await;
        store.insert(submission(Some("u1"), 1, 60)).await.expect("insert");
        store.insert(submission(Some("u1"), 2, 80)).await.expect("insert");
        store.insert(submission(Some("u1"), 2, 90)).await.expect("insert");
        let (rows, total) = store.query("u1", 1, 20, Some(2)).await.expect("query");
        assert_eq!(total, 2);
        assert!(rows.iter().all(|r| r.sentence_id == 2));
    }

    #[tokio::test]
    async fn query_is_scoped_per_user() {
        let (_dir, store) = store().await;
        store.insert(submission(Some("u1"), 1, 60)).await.expect("insert");
        store.insert(submission(Some("u2"), 1, 90)).await.expect("insert");
        store.insert(submission(None, 1, 40)).await.expect("insert");
        let (rows, total) = store.query("u1", 1, 20, None).await.expect("query");
        assert_eq!(total, 1);
        assert_eq!(rows[0].score, 60);
    }

    #[tokio::test]
    async fn stats_for_user_without_submissions_is_zeroed() {
        let (_dir, store) = store().await;
        let stats = store.stats("nobody").await.expect("stats");
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.average_score, 0);
        assert_eq!(stats.max_score, 0);
        assert_eq!(stats.min_score, 0);
        assert!(stats.recent_average.is_none());
    }

    #[tokio::test]
    async fn stats_reports_recent_average_at_exactly_thirty_samples() {
        let (_dir, store) = store().await;
        for score in 1..=30 {
            store
                .insert(submission(Some("u1"), score, score))
                .await
                .expect("insert");
        }
        let stats = store.stats("u1").await.expect("stats");
        assert_eq!(stats.total_count, 30);
        // mean of 1..=30 is 15.5, rounded half-up to 16
        assert_eq!(stats.average_score, 16);
        assert_eq!(stats.max_score, 30);
        assert_eq!(stats.min_score, 1);
        assert_eq!(stats.recent_average, Some(16));
    }

    #[tokio::test]
    async fn stats_withholds_recent_average_below_thirty_samples() {
        let (_dir, store) = store().await;
        for score in 1..=29 {
            store
                .insert(submission(Some("u1"), score, score))
                .await
                .expect("insert");
        }
        let stats = store.stats("u1").await.expect("stats");
        assert_eq!(stats.total_count, 29);
        assert!(stats.recent_average.is_none());
    }

    #[test]
    fn recent_average_is_omitted_from_json_when_absent() {
        let json = serde_json::to_value(UserStats::empty()).expect("serialize");
        assert!(json.get("recentAverage").is_none());
        assert_eq!(json["totalCount"], 0);
    }

    #[test]
    fn average_rounds_half_up() {
        assert_eq!(round_half_up_average(&[70, 71]), 71);
        assert_eq!(round_half_up_average(&[70, 70, 71]), 70);
        assert_eq!(round_half_up_average(&[]), 0);
    }
}
