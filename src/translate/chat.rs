use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderKind;
use crate::error::{Result, TranslateError};
use super::TranslationBackend;
use super::common::{
    build_translation_prompt, error_from_response, network_error, parse_translations,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}

/// OpenAI-compatible chat completions backend, used for Groq and Cerebras
pub struct ChatBackend {
    kind: ProviderKind,
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatBackend {
    pub fn new(
        kind: ProviderKind,
        client: Client,
        base_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            kind,
            client,
            base_url,
            api_key,
            model,
        }
    }

    fn temperature(&self) -> f64 {
        match self.kind {
            ProviderKind::Cerebras => 0.0,
            _ => 0.7,
        }
    }

    fn name(&self) -> &'static str {
        self.kind.display_name()
    }
}

/// Groq also lists speech and moderation models; keep the text ones
pub fn filter_text_models(kind: ProviderKind, ids: Vec<String>) -> Vec<String> {
    let mut models: Vec<String> = ids
        .into_iter()
        .filter(|id| {
            if kind != ProviderKind::Groq {
                return true;
            }
            let id = id.to_lowercase();
            !id.contains("whisper") && !id.contains("tts") && !id.contains("guard")
        })
        .collect();
    models.sort();
    models
}

#[async_trait]
impl TranslationBackend for ChatBackend {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.model.is_empty() {
            return Err(TranslateError::Config(format!("{} model is not selected", self.name())));
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_translation_prompt(texts, target_language),
            }],
            temperature: self.temperature(),
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending {} texts to {} ({})", texts.len(), url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| network_error(self.name(), e))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name(), response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::MalformedResponse {
                provider: self.name().to_string(),
                message: format!("failed to parse response: {}", e),
            })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| TranslateError::MalformedResponse {
                provider: self.name().to_string(),
                message: "no response from API".to_string(),
            })?;

        parse_translations(self.name(), &content, texts.len())
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| network_error(self.name(), e))?;

        if !response.status().is_success() {
            return Err(error_from_response(self.name(), response).await);
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::MalformedResponse {
                provider: self.name().to_string(),
                message: format!("failed to parse model list: {}", e),
            })?;

        Ok(filter_text_models(
            self.kind,
            models.data.into_iter().map(|m| m.id).collect(),
        ))
    }
}
