//! Shared fakes for route tests.

use crate::config::AppConfig;
use crate::server::AppState;
use eg_llm::{CompletionBackend, LlmError, ModelClient};
use eg_store::Db;
use std::path::Path;
use std::sync::Arc;

/// Scripted completion backend.
pub(crate) enum FakeBackend {
    /// Always answer with this text.
    Respond(String),
    /// Always fail with a provider error.
    Fail(String),
    /// Answer with `response`, except for prompts containing `marker`.
    FailWhenContains { response: String, marker: String },
}

#[async_trait::async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, prompt: &str) -> eg_llm::Result<String> {
        match self {
            Self::Respond(text) => Ok(text.clone()),
            Self::Fail(message) => Err(LlmError::Provider(message.clone())),
            Self::FailWhenContains { response, marker } => {
                if prompt.contains(marker) {
                    Err(LlmError::Provider("simulated outage".to_string()))
                } else {
                    Ok(response.clone())
                }
            }
        }
    }
}

/// State over an initialized scratch database and the given fake backend.
pub(crate) async fn test_state(db_path: &Path, backend: FakeBackend) -> AppState {
    let mut cfg = AppConfig::default();
    cfg.llm.gemini_api_key = "test-key".to_string();
    cfg.auth.token_secret = "test-secret".to_string();
    let db = Db::new(db_path);
    db.init().await.expect("init db");
    AppState::new(cfg, ModelClient::new(Arc::new(backend)), db)
}

/// State whose database writes always fail (path inside a missing directory).
pub(crate) fn broken_store_state(backend: FakeBackend) -> AppState {
    let mut cfg = AppConfig::default();
    cfg.llm.gemini_api_key = "test-key".to_string();
    cfg.auth.token_secret = "test-secret".to_string();
    let db = Db::new("/nonexistent-engrade-dir/engrade.db");
    AppState::new(cfg, ModelClient::new(Arc::new(backend)), db)
}

pub(crate) const SCENARIO_FEEDBACK: &str = r#"{
    "score": 70,
    "corrected_sentence": "I drank coffee this morning.",
    "feedback_summary": "시제만 다듬으면 완벽해요!",
    "detailed_feedback": [
        { "type": "Suggestion", "original": "drink", "comment": "과거형 'drank'를 써보세요." }
    ]
}"#;

/// Count submission rows directly, bypassing the store's per-user queries.
pub(crate) fn count_submissions(db_path: &Path) -> i64 {
    let conn = rusqlite::Connection::open(db_path).expect("open db");
    conn.query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))
        .expect("count")
}
