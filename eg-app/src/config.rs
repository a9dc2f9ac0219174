//! EnGrade configuration loader.
//!
//! Config comes from a TOML file (optional; defaults apply when absent),
//! then env-var overrides, then `validate()` before anything is served.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub questions: QuestionsConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_http_max_in_flight")]
    pub http_max_in_flight: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token_secret: String,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

/// The question feed starts from a random offset when the client does not ask
/// for one. The [min, max] range reproduces the upstream product behavior and
/// is kept configurable because its intent is not documented anywhere.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionsConfig {
    #[serde(default = "default_fresh_offset_min")]
    pub fresh_offset_min: i64,
    #[serde(default = "default_fresh_offset_max")]
    pub fresh_offset_max: i64,
    #[serde(default = "default_question_limit")]
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    /// Upper bound on sentence ids per translate-batch request.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
    /// Concurrent completion calls per translation group.
    #[serde(default = "default_group_size")]
    pub group_size: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_http_timeout_seconds() -> u64 {
    120
}

fn default_http_max_in_flight() -> usize {
    64
}

fn default_model() -> String {
    eg_llm::gemini::DEFAULT_MODEL.to_string()
}

fn default_token_ttl_seconds() -> i64 {
    7 * 24 * 60 * 60
}

fn default_db_path() -> String {
    "engrade.db".to_string()
}

fn default_fresh_offset_min() -> i64 {
    40
}

fn default_fresh_offset_max() -> i64 {
    120
}

fn default_question_limit() -> u32 {
    10
}

fn default_max_batch() -> usize {
    10
}

fn default_group_size() -> usize {
    eg_llm::client::TRANSLATION_GROUP_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            http_timeout_seconds: default_http_timeout_seconds(),
            http_max_in_flight: default_http_max_in_flight(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            model: default_model(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for QuestionsConfig {
    fn default() -> Self {
        Self {
            fresh_offset_min: default_fresh_offset_min(),
            fresh_offset_max: default_fresh_offset_max(),
            limit: default_question_limit(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_batch: default_max_batch(),
            group_size: default_group_size(),
        }
    }
}

impl AppConfig {
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        let mut cfg = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
            toml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?
        } else {
            tracing::debug!(config_path = %path.display(), "config file absent; using defaults");
            AppConfig::default()
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ENGRADE_BIND_ADDR") {
            if !v.trim().is_empty() {
                self.server.bind_addr = v;
            }
        }
        if let Ok(v) = std::env::var("GEMINI_API_KEY") {
            if !v.trim().is_empty() {
                self.llm.gemini_api_key = v;
            }
        }
        if let Ok(v) = std::env::var("ENGRADE_MODEL") {
            if !v.trim().is_empty() {
                self.llm.model = v;
            }
        }
        if let Ok(v) = std::env::var("ENGRADE_TOKEN_SECRET") {
            if !v.trim().is_empty() {
                self.auth.token_secret = v;
            }
        }
        if let Ok(v) = std::env::var("ENGRADE_DB_PATH") {
            if !v.trim().is_empty() {
                self.storage.db_path = v;
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.llm.gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "llm.gemini_api_key (or GEMINI_API_KEY) is required"
            ));
        }
        if self.auth.token_secret.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "auth.token_secret (or ENGRADE_TOKEN_SECRET) is required"
            ));
        }
        if self.auth.token_ttl_seconds <= 0 {
            return Err(anyhow::anyhow!("auth.token_ttl_seconds must be > 0"));
        }
        if self.questions.fresh_offset_min < 0
            || self.questions.fresh_offset_max < self.questions.fresh_offset_min
        {
            return Err(anyhow::anyhow!(
                "questions.fresh_offset range must satisfy 0 <= min <= max"
            ));
        }
        if self.questions.limit == 0 {
            return Err(anyhow::anyhow!("questions.limit must be > 0"));
        }
        if self.translation.max_batch == 0 || self.translation.group_size == 0 {
            return Err(anyhow::anyhow!(
                "translation.max_batch and translation.group_size must be > 0"
            ));
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    Path::new("engrade.toml").to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.llm.gemini_api_key = "key".to_string();
        cfg.auth.token_secret = "secret".to_string();
        cfg
    }

    #[test]
    fn defaults_carry_upstream_offset_range() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.questions.fresh_offset_min, 40);
        assert_eq!(cfg.questions.fresh_offset_max, 120);
        assert_eq!(cfg.translation.group_size, 3);
        assert_eq!(cfg.translation.max_batch, 10);
    }

    #[test]
    fn validate_requires_api_key_and_secret() {
        assert!(AppConfig::default().validate().is_err());
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_offset_range() {
        let mut cfg = configured();
        cfg.questions.fresh_offset_min = 200;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [llm]
            gemini_api_key = "key"
            model = "gemini-x"

            [translation]
            group_size = 5
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.llm.model, "gemini-x");
        assert_eq!(cfg.translation.group_size, 5);
        assert_eq!(cfg.translation.max_batch, 10);
    }
}
