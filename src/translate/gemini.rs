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

const PROVIDER: &str = "Gemini";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModel {
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiModelsResponse {
    #[serde(default)]
    pub models: Vec<GeminiModel>,
}

/// Google Gemini backend; the API key travels in the query string
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(client: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    /// Model ids from the model list carry a `models/` prefix the path already has
    fn model_path(&self) -> &str {
        self.model.strip_prefix("models/").unwrap_or(&self.model)
    }
}

/// Keep models that can generate text
pub fn filter_text_models(models: Vec<GeminiModel>) -> Vec<String> {
    let mut names: Vec<String> = models
        .into_iter()
        .filter(|model| {
            let name = model.name.to_lowercase();
            model.supported_generation_methods.iter().any(|m| m == "generateContent")
                && (name.contains("gemini") || name.contains("text"))
        })
        .map(|model| model.name)
        .collect();
    names.sort();
    names
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if self.model.is_empty() {
            return Err(TranslateError::Config("Gemini model is not selected".to_string()));
        }

        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: build_translation_prompt(texts, target_language),
                }],
                role: None,
            }],
            generation_config: GeminiGenerationConfig { temperature: 1.0 },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_path());
        debug!("Sending {} texts to {}", texts.len(), url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let generated: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| TranslateError::MalformedResponse {
                    provider: PROVIDER.to_string(),
                    message: format!("failed to parse response: {}", e),
                })?;

        let content = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| TranslateError::MalformedResponse {
                provider: PROVIDER.to_string(),
                message: "no response from Gemini API".to_string(),
            })?;

        parse_translations(PROVIDER, &content, texts.len())
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(PROVIDER, response).await);
        }

        let models: GeminiModelsResponse =
            response
                .json()
                .await
                .map_err(|e| TranslateError::MalformedResponse {
                    provider: PROVIDER.to_string(),
                    message: format!("failed to parse model list: {}", e),
                })?;

        Ok(filter_text_models(models.models))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, methods: &[&str]) -> GeminiModel {
        GeminiModel {
            name: name.to_string(),
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_model_filter() {
        let models = filter_text_models(vec![
            model("models/gemini-1.5-pro", &["generateContent", "countTokens"]),
            model("models/embedding-001", &["embedContent"]),
            model("models/aqa", &["generateAnswer"]),
            model("models/gemini-1.5-flash", &["generateContent"]),
            model("models/imagen-3.0", &["generateContent"]),
        ]);
        assert_eq!(models, vec!["models/gemini-1.5-flash", "models/gemini-1.5-pro"]);
    }

    #[test]
    fn test_model_prefix_is_stripped_for_path() {
        let backend = GeminiBackend::new(
            Client::new(),
            String::new(),
            String::new(),
            "models/gemini-1.5-flash".to_string(),
        );
        assert_eq!(backend.model_path(), "gemini-1.5-flash");
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: "hi".to_string() }],
                role: None,
            }],
            generation_config: GeminiGenerationConfig { temperature: 1.0 },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["temperature"], 1.0);
        assert!(value["contents"][0].get("role").is_none());
    }

    #[test]
    fn test_blocked_response_has_no_candidates() {
        let json = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(response.candidates.is_empty());
    }
}
