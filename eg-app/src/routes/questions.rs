//! Practice question feed.

use crate::config::QuestionsConfig;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Query;
use axum::routing::get;
use axum::{Extension, Json};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new().route("/api/v1/questions", get(list_questions))
}

#[derive(Debug, Deserialize)]
struct QuestionsQuery {
    #[serde(default)]
    offset: Option<i64>,
}

#[tracing::instrument(level = "info", skip_all)]
async fn list_questions(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<QuestionsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let offset = effective_offset(query.offset, &state.cfg.questions);
    let rows = state
        .sentences
        .fresh_questions(offset, state.cfg.questions.limit)
        .await?;

    let questions: Vec<serde_json::Value> = rows
        .into_iter()
        .filter_map(|row| {
            row.korean_sentence.map(|korean| {
                json!({
                    "id": row.id,
                    "korean": korean,
                    "english": row.english_sentence,
                })
            })
        })
        .collect();

    Ok(Json(json!({ "questions": questions })))
}

/// An explicit positive offset wins; otherwise pick a random one from the
/// configured range so repeat visitors don't always start at the same
/// sentences.
fn effective_offset(requested: Option<i64>, cfg: &QuestionsConfig) -> i64 {
    match requested {
        Some(offset) if offset > 0 => offset,
        _ => rand::rng().random_range(cfg.fresh_offset_min..=cfg.fresh_offset_max),
    }
}
