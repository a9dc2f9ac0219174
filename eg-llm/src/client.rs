use crate::error::{LlmError, Result};
use crate::prompt;
use crate::types::Feedback;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// Items per concurrent translation group. The group size bounds how many
/// completion calls are in flight at once, as backpressure on the provider.
pub const TRANSLATION_GROUP_SIZE: usize = 3;

/// Single-turn text completion. `GeminiClient` is the production
/// implementation; tests substitute fakes.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TranslationInput {
    pub id: i64,
    pub english: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationOutcome {
    pub id: i64,
    pub korean: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// High-level model operations: evaluation of a user translation, one-way
/// English to Korean translation, and grouped batch translation.
#[derive(Clone)]
pub struct ModelClient {
    backend: Arc<dyn CompletionBackend>,
    group_size: usize,
}

impl ModelClient {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            group_size: TRANSLATION_GROUP_SIZE,
        }
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size.max(1);
        self
    }

    /// Score the user's English translation of a Korean sentence.
    ///
    /// Neither a provider failure nor malformed model output is retried; both
    /// propagate so the caller can fail the evaluation request as a whole.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn evaluate(&self, korean: &str, user_answer: &str) -> Result<Feedback> {
        if korean.trim().is_empty() || user_answer.trim().is_empty() {
            return Err(LlmError::InvalidInput(
                "korean sentence and user answer are required".to_string(),
            ));
        }
        let prompt = prompt::evaluation_prompt(korean, user_answer);
        let raw = self.backend.complete(&prompt).await?;
        parse_feedback(&raw)
    }

    /// Translate one English sentence to Korean, returning the trimmed
    /// response text verbatim.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn translate(&self, english: &str) -> Result<String> {
        if english.trim().is_empty() {
            return Err(LlmError::InvalidInput(
                "english sentence is required".to_string(),
            ));
        }
        let prompt = prompt::translation_prompt(english);
        let raw = self.backend.complete(&prompt).await?;
        Ok(raw.trim().to_string())
    }

    /// Translate a list of sentences in groups of `group_size`.
    ///
    /// Groups run sequentially; the items inside a group run concurrently and
    /// all settle before the next group starts. Outcomes are per item: one
    /// failure never aborts its siblings, and the output always has exactly
    /// one entry per input, correlated by id.
    #[tracing::instrument(level = "info", skip_all, fields(item_count = items.len()))]
    pub async fn translate_batch(&self, items: &[TranslationInput]) -> Vec<TranslationOutcome> {
        let mut results = Vec::with_capacity(items.len());
        for group in items.chunks(self.group_size) {
            let settled = join_all(group.iter().map(|item| async move {
                match self.translate(&item.english).await {
                    Ok(korean) => TranslationOutcome {
                        id: item.id,
                        korean,
                        error: None,
                    },
                    Err(e) => {
                        tracing::warn!(sentence_id = item.id, error = %e, "translation failed");
                        TranslationOutcome {
                            id: item.id,
                            korean: String::new(),
                            error: Some(e.to_string()),
                        }
                    }
                }
            }))
            .await;
            results.extend(settled);
        }
        results
    }
}

/// Strip Markdown code-fence delimiters the model tends to wrap JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse cleaned model output into a validated [`Feedback`].
pub fn parse_feedback(raw: &str) -> Result<Feedback> {
    let cleaned = strip_code_fences(raw);
    let feedback: Feedback = serde_json::from_str(&cleaned)?;
    feedback.validate()?;
    Ok(feedback)
}
