//! Per-user submission history and score statistics. Both require a verified
//! identity; anonymous evaluation never lands here.

use crate::auth;
use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Query;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Extension, Json};
use eg_store::UserStats;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/api/v1/submissions", get(list_submissions))
        .route("/api/v1/submissions/stats", get(get_stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    sentence_id: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Pagination {
    current_page: u32,
    total_pages: u64,
    total_count: u64,
    has_next: bool,
    has_prev: bool,
}

impl Pagination {
    pub(crate) fn new(page: u32, page_size: u32, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(page_size));
        Self {
            current_page: page,
            total_pages,
            total_count,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[tracing::instrument(level = "info", skip_all)]
async fn list_submissions(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = auth::identity_from_headers(&state.auth, &headers)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let (rows, total) = state
        .submissions
        .query(&user.user_id, page, limit, query.sentence_id)
        .await?;

    Ok(Json(json!({
        "submissions": rows,
        "pagination": Pagination::new(page, limit, total),
    })))
}

#[tracing::instrument(level = "info", skip_all)]
async fn get_stats(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserStats>, ApiError> {
    let user = auth::identity_from_headers(&state.auth, &headers)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))?;
    let stats = state.submissions.stats(&user.user_id).await?;
    Ok(Json(stats))
}
