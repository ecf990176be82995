// Pluggable translation backends
//
// One trait, one implementation per wire protocol:
// - chat: OpenAI-compatible chat completions (Groq, Cerebras)
// - gemini: Google Gemini generateContent
//
// Every backend prompt MUST tell the model to keep format specifiers (%s, %d),
// placeholders ({name}), URLs and dotted package identifiers unchanged, and
// MUST ask for the results in input order.

pub mod common;
pub mod chat;
pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use common::*;
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{Result, TranslateError};

/// Capability to translate an ordered list of strings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn provider(&self) -> ProviderKind;

    fn model(&self) -> String;

    /// Translate `texts` in order. On success the result has at most
    /// `texts.len()` entries; fewer means the reply could not be fully matched.
    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>>;

    /// Translate one string with the unnumbered prompt
    async fn translate_single(&self, text: &str, target_language: &str) -> Result<String> {
        let mut translated = self
            .translate_batch(&[text.to_string()], target_language)
            .await?;
        if translated.is_empty() {
            return Err(TranslateError::MalformedResponse {
                provider: self.provider().to_string(),
                message: "empty translation".to_string(),
            });
        }
        Ok(translated.swap_remove(0))
    }

    /// Text-generation models offered by the provider, sorted ascending
    async fn fetch_available_models(&self) -> Result<Vec<String>>;
}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create the backend for the selected provider
    pub fn create_backend(
        config: &ProviderConfig,
        timeout: Duration,
    ) -> Result<Arc<dyn TranslationBackend>> {
        Self::create_backend_for(config, config.selected, timeout)
    }

    /// Create a backend for `kind`, whatever provider is currently selected
    pub fn create_backend_for(
        config: &ProviderConfig,
        kind: ProviderKind,
        timeout: Duration,
    ) -> Result<Arc<dyn TranslationBackend>> {
        let settings = config.settings(kind);
        let api_key = settings.resolved_api_key(kind);
        if api_key.is_empty() {
            return Err(TranslateError::Config(format!(
                "{} API key is not set. Add it to the config file or set {}",
                kind,
                kind.api_key_env()
            )));
        }

        let client = common::build_client(timeout)?;
        let base_url = settings.resolved_base_url(kind);
        let model = settings.model.trim().to_string();

        let backend: Arc<dyn TranslationBackend> = match kind {
            ProviderKind::Groq | ProviderKind::Cerebras => {
                Arc::new(chat::ChatBackend::new(kind, client, base_url, api_key, model))
            }
            ProviderKind::Gemini => {
                Arc::new(gemini::GeminiBackend::new(client, base_url, api_key, model))
            }
        };
        Ok(backend)
    }
}
