pub mod client;
pub mod error;
pub mod gemini;
pub mod prompt;
pub mod types;

pub use client::{CompletionBackend, ModelClient, TranslationInput, TranslationOutcome};
pub use error::{LlmError, Result};
pub use gemini::GeminiClient;
pub use types::{Feedback, FeedbackItem, FeedbackKind};
