//! Sentence catalog listing and batched translation backfill.

use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Extension, Json};
use eg_llm::TranslationInput;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/api/v1/sentences", get(list_sentences))
        .route("/api/v1/sentences/translate", post(translate_batch))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

#[tracing::instrument(level = "info", skip_all)]
async fn list_sentences(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let (rows, total) = state.sentences.list(page, limit).await?;
    Ok(Json(json!({ "sentences": rows, "totalCount": total })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TranslateBatchRequest {
    pub sentence_ids: Vec<i64>,
}

#[tracing::instrument(level = "info", skip_all, fields(id_count = req.sentence_ids.len()))]
async fn translate_batch(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<TranslateBatchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = run_translate_batch(&state, &req.sentence_ids).await?;
    Ok(Json(report))
}

/// Translate the requested sentences and write each Korean result back.
/// Outcomes are per sentence: a translation or write-back failure marks that
/// entry as failed without touching its siblings.
pub(crate) async fn run_translate_batch(
    state: &AppState,
    sentence_ids: &[i64],
) -> Result<serde_json::Value, ApiError> {
    if sentence_ids.is_empty() {
        return Err(ApiError::Validation("sentenceIds must not be empty".to_string()));
    }
    let max_batch = state.cfg.translation.max_batch;
    if sentence_ids.len() > max_batch {
        return Err(ApiError::Validation(format!(
            "at most {max_batch} sentences per request"
        )));
    }

    let rows = state.sentences.by_ids(sentence_ids).await?;
    if rows.is_empty() {
        return Err(ApiError::NotFound("no matching sentences".to_string()));
    }

    let inputs: Vec<TranslationInput> = rows
        .iter()
        .map(|row| TranslationInput {
            id: row.id,
            english: row.english_sentence.clone(),
        })
        .collect();
    let outcomes = state.model.translate_batch(&inputs).await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut success = 0u32;
    let mut failed = 0u32;
    for outcome in outcomes {
        let english = rows
            .iter()
            .find(|row| row.id == outcome.id)
            .map(|row| row.english_sentence.clone())
            .unwrap_or_default();

        if let Some(error) = outcome.error {
            failed += 1;
            results.push(json!({
                "sentenceId": outcome.id,
                "englishSentence": english,
                "koreanSentence": "",
                "status": "error",
                "error": error,
            }));
            continue;
        }

        match state.sentences.set_korean(outcome.id, &outcome.korean).await {
            Ok(()) => {
                success += 1;
                results.push(json!({
                    "sentenceId": outcome.id,
                    "englishSentence": english,
                    "koreanSentence": outcome.korean,
                    "status": "success",
                }));
            }
            Err(e) => {
                tracing::warn!(sentence_id = outcome.id, error = %e, "translation write-back failed");
                failed += 1;
                results.push(json!({
                    "sentenceId": outcome.id,
                    "englishSentence": english,
                    "koreanSentence": outcome.korean,
                    "status": "error",
                    "error": "failed to store translation",
                }));
            }
        }
    }

    Ok(json!({ "success": success, "failed": failed, "results": results }))
}
