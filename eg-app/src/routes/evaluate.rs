//! The evaluation endpoint: validate, score via the model, persist
//! best-effort, and return the feedback.

use crate::auth::{self, UserRef};
use crate::error::{ApiError, validate_field};
use crate::server::AppState;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Extension, Json};
use eg_llm::{Feedback, LlmError};
use eg_store::NewSubmission;
use serde::Deserialize;
use std::sync::Arc;

pub fn router() -> axum::Router {
    axum::Router::new().route("/api/v1/evaluate", post(evaluate))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EvaluateRequest {
    pub korean: String,
    /// Reference translation. Required at the wire for parity with the
    /// practice client, though scoring uses the Korean sentence alone.
    pub english: String,
    pub user_answer: String,
    #[serde(default)]
    pub sentence_id: Option<i64>,
}

#[tracing::instrument(level = "info", skip_all)]
async fn evaluate(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<Feedback>, ApiError> {
    let identity = auth::identity_from_headers(&state.auth, &headers);
    let feedback = run_evaluation(&state, req, identity).await?;
    Ok(Json(feedback))
}

/// The request-handling core. Validation and model failures fail the request;
/// a persistence failure does not.
pub(crate) async fn run_evaluation(
    state: &AppState,
    req: EvaluateRequest,
    identity: Option<UserRef>,
) -> Result<Feedback, ApiError> {
    let korean = validate_field("korean", &req.korean)?;
    validate_field("english", &req.english)?;
    let user_answer = validate_field("userAnswer", &req.user_answer)?;

    let feedback = state
        .model
        .evaluate(&korean, &user_answer)
        .await
        .map_err(|e| match e {
            LlmError::InvalidInput(msg) => ApiError::Validation(msg),
            other => {
                tracing::error!(error = %other, "evaluation failed");
                ApiError::Evaluation("evaluation failed; please try again".to_string())
            }
        })?;

    if let Some(sentence_id) = req.sentence_id {
        record_submission(state, sentence_id, identity, &korean, &user_answer, &feedback).await;
    }

    Ok(feedback)
}

/// Best-effort bookkeeping. The evaluation result is the product; the write
/// is secondary, so its error branch is logged and dropped rather than
/// surfaced to the caller.
async fn record_submission(
    state: &AppState,
    sentence_id: i64,
    identity: Option<UserRef>,
    korean: &str,
    user_answer: &str,
    feedback: &Feedback,
) {
    let items_json =
        serde_json::to_string(&feedback.items).unwrap_or_else(|_| "[]".to_string());
    let new = NewSubmission {
        user_id: identity.map(|u| u.user_id),
        sentence_id,
        user_answer: user_answer.to_string(),
        korean_sentence: korean.to_string(),
        score: i64::from(feedback.score),
        corrected_sentence: feedback.corrected_sentence.clone(),
        summary: feedback.summary.clone(),
        items_json,
    };
    match state.submissions.insert(new).await {
        Ok(row) => {
            tracing::debug!(submission_id = %row.id, sentence_id, "submission recorded");
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                sentence_id,
                "submission write failed; evaluation response unaffected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        FakeBackend, SCENARIO_FEEDBACK, broken_store_state, count_submissions, test_state,
    };

    fn request(sentence_id: Option<i64>) -> EvaluateRequest {
        EvaluateRequest {
            korean: "나는 오늘 아침에 커피를 마셨다.".to_string(),
            english: "I drank coffee this morning.".to_string(),
            user_answer: "I drink coffee this morning.".to_string(),
            sentence_id,
        }
    }

    fn user() -> UserRef {
        UserRef {
            user_id: "u1".to_string(),
            email: "learner@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_model_feedback_and_records_submission() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        let state = test_state(&db_path, FakeBackend::Respond(SCENARIO_FEEDBACK.into())).await;

        let feedback = run_evaluation(&state, request(Some(7)), Some(user()))
            .await
            .expect("evaluation");
        assert_eq!(feedback.score, 70);
        assert_eq!(feedback.corrected_sentence, "I drank coffee this morning.");

        let (rows, total) = state.submissions.query("u1", 1, 20, None).await.expect("query");
        assert_eq!(total, 1);
        assert_eq!(rows[0].sentence_id, 7);
        assert_eq!(rows[0].score, 70);
        assert_eq!(rows[0].user_answer, "I drink coffee this morning.");
    }

    #[tokio::test]
    async fn anonymous_submission_is_recorded_with_null_user() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        let state = test_state(&db_path, FakeBackend::Respond(SCENARIO_FEEDBACK.into())).await;

        run_evaluation(&state, request(Some(7)), None)
            .await
            .expect("evaluation");
        assert_eq!(count_submissions(&db_path), 1);
        // Nothing shows up under any user's history.
        let (_, total) = state.submissions.query("u1", 1, 20, None).await.expect("query");
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn skips_persistence_without_sentence_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        let state = test_state(&db_path, FakeBackend::Respond(SCENARIO_FEEDBACK.into())).await;

        run_evaluation(&state, request(None), Some(user()))
            .await
            .expect("evaluation");
        assert_eq!(count_submissions(&db_path), 0);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_before_the_model_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        let state = test_state(&db_path, FakeBackend::Fail("should not be called".into())).await;

        let mut req = request(Some(7));
        req.user_answer = "   ".to_string();
        let err = run_evaluation(&state, req, None).await.expect_err("must fail");
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(count_submissions(&db_path), 0);
    }

    #[tokio::test]
    async fn malformed_model_output_fails_without_persistence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        let state =
            test_state(&db_path, FakeBackend::Respond("Great translation!".into())).await;

        let err = run_evaluation(&state, request(Some(7)), Some(user()))
            .await
            .expect_err("must fail");
        assert!(matches!(err, ApiError::Evaluation(_)));
        assert_eq!(count_submissions(&db_path), 0);
    }

    #[tokio::test]
    async fn provider_outage_fails_the_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.db");
        let state = test_state(&db_path, FakeBackend::Fail("quota exceeded".into())).await;

        let err = run_evaluation(&state, request(Some(7)), None)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ApiError::Evaluation(_)));
        assert_eq!(count_submissions(&db_path), 0);
    }

    #[tokio::test]
    async fn store_outage_is_swallowed_and_feedback_still_returned() {
        let state = broken_store_state(FakeBackend::Respond(SCENARIO_FEEDBACK.into()));
        let feedback = run_evaluation(&state, request(Some(7)), Some(user()))
            .await
            .expect("evaluation must survive a store outage");
        assert_eq!(feedback.score, 70);
    }
}
