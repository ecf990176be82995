use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::error::{Result, TranslateError};
use crate::translate::common::is_supported_language;

pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 5;
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 10;

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_output_dir() -> String {
    "VTU-Translate".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    pub translate: TranslateConfig,
}

/// AI provider that performs the translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Groq OpenAI-compatible API, bearer token
    Groq,
    /// Google Gemini generateContent API, key in query string
    Gemini,
    /// Cerebras OpenAI-compatible API, bearer token
    Cerebras,
}

impl ProviderKind {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
            Self::Cerebras => "cerebras",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Groq => "Groq",
            Self::Gemini => "Gemini",
            Self::Cerebras => "Cerebras",
        }
    }

    /// Environment variable consulted when the config file has no key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Cerebras => "CEREBRAS_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Cerebras => "https://api.cerebras.ai/v1",
        }
    }

    /// Check the provider-specific API key format
    pub fn validate_api_key(&self, api_key: &str) -> Result<()> {
        match self {
            Self::Groq if !api_key.starts_with("gsk_") || api_key.len() < 20 => Err(
                TranslateError::Config("Groq API key must start with 'gsk_'".to_string()),
            ),
            Self::Gemini if !api_key.starts_with("AIza") => Err(TranslateError::Config(
                "Gemini API key must start with 'AIza'".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "gemini" => Ok(Self::Gemini),
            "cerebras" => Ok(Self::Cerebras),
            other => Err(TranslateError::Config(format!("Unknown provider: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider used for translation
    pub selected: ProviderKind,
    pub groq: ProviderSettings,
    pub gemini: ProviderSettings,
    pub cerebras: ProviderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key; falls back to the provider's environment variable when empty
    #[serde(default)]
    pub api_key: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Override for the provider endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    fn new(model: &str) -> Self {
        Self {
            api_key: String::new(),
            model: model.to_string(),
            base_url: None,
        }
    }

    pub fn resolved_api_key(&self, kind: ProviderKind) -> String {
        if !self.api_key.trim().is_empty() {
            return self.api_key.trim().to_string();
        }
        std::env::var(kind.api_key_env())
            .map(|key| key.trim().to_string())
            .unwrap_or_default()
    }

    pub fn resolved_base_url(&self, kind: ProviderKind) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(kind.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Target language code (vi, en, zh, ru, ko, es, fr, de, ja)
    pub target_language: String,
    /// Translation speed from 1 (slowest) to 5 (fastest)
    pub speed: u8,
    /// Number of strings sent in one request, 1 to 10
    pub batch_size: usize,
    /// Hard timeout for a single provider call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Root directory for translated `res/values-*/strings.xml` output
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig {
                selected: ProviderKind::Groq,
                groq: ProviderSettings::new("meta-llama/llama-4-maverick-17b-128e-instruct"),
                gemini: ProviderSettings::new("gemini-1.5-flash"),
                cerebras: ProviderSettings::new("llama3.1-8b"),
            },
            translate: TranslateConfig {
                target_language: "vi".to_string(),
                speed: 3,
                batch_size: 1,
                request_timeout_secs: default_request_timeout_secs(),
                output_dir: default_output_dir(),
            },
        }
    }
}

impl ProviderConfig {
    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Groq => &self.groq,
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Cerebras => &self.cerebras,
        }
    }

    pub fn settings_mut(&mut self, kind: ProviderKind) -> &mut ProviderSettings {
        match kind {
            ProviderKind::Groq => &mut self.groq,
            ProviderKind::Gemini => &mut self.gemini,
            ProviderKind::Cerebras => &mut self.cerebras,
        }
    }

    pub fn active(&self) -> &ProviderSettings {
        self.settings(self.selected)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslateError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| TranslateError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TranslateError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslateError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Check the translation settings and the active provider's credentials
    pub fn validate(&self) -> Result<()> {
        self.validate_translate_settings()?;

        let kind = self.provider.selected;
        let settings = self.provider.active();
        let api_key = settings.resolved_api_key(kind);
        if api_key.is_empty() {
            return Err(TranslateError::Config(format!(
                "{} API key is not set. Add it to the config file or set {}",
                kind,
                kind.api_key_env()
            )));
        }
        kind.validate_api_key(&api_key)?;

        if settings.model.trim().is_empty() {
            return Err(TranslateError::Config(format!("{} model is not selected", kind)));
        }

        Ok(())
    }

    pub fn validate_translate_settings(&self) -> Result<()> {
        let translate = &self.translate;
        if !(MIN_SPEED..=MAX_SPEED).contains(&translate.speed) {
            return Err(TranslateError::Config(format!(
                "Translation speed must be between {} and {}, got {}",
                MIN_SPEED, MAX_SPEED, translate.speed
            )));
        }
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&translate.batch_size) {
            return Err(TranslateError::Config(format!(
                "Batch size must be between {} and {}, got {}",
                MIN_BATCH_SIZE, MAX_BATCH_SIZE, translate.batch_size
            )));
        }
        if translate.request_timeout_secs == 0 {
            return Err(TranslateError::Config("Request timeout must be positive".to_string()));
        }
        if !is_supported_language(&translate.target_language) {
            warn!(
                "Target language '{}' has no prompt name; the model will be asked for Vietnamese",
                translate.target_language
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(kind: ProviderKind, key: &str) -> Config {
        let mut config = Config::default();
        config.provider.selected = kind;
        config.provider.settings_mut(kind).api_key = key.to_string();
        config
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.provider.selected, ProviderKind::Groq);
        assert_eq!(parsed.translate.target_language, "vi");
        assert_eq!(parsed.translate.speed, 3);
        assert_eq!(parsed.translate.batch_size, 1);
    }

    #[test]
    fn test_optional_fields_use_defaults() {
        let text = r#"
[provider]
selected = "gemini"

[provider.groq]
model = "llama"

[provider.gemini]
api_key = "AIzaSyExample"
model = "models/gemini-1.5-pro"

[provider.cerebras]
model = "llama3.1-8b"

[translate]
target_language = "ja"
speed = 5
batch_size = 4
"#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.provider.selected, ProviderKind::Gemini);
        assert_eq!(config.translate.request_timeout_secs, 60);
        assert_eq!(config.translate.output_dir, "VTU-Translate");
        assert!(config.provider.groq.api_key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_groq_key_prefix_is_enforced() {
        let config = config_with_key(ProviderKind::Groq, "sk-not-a-groq-key-at-all");
        assert!(matches!(config.validate(), Err(TranslateError::Config(_))));

        let config = config_with_key(ProviderKind::Groq, "gsk_0123456789abcdefghij");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cerebras_key_has_no_prefix_rule() {
        let config = config_with_key(ProviderKind::Cerebras, "csk-anything");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_settings_are_rejected() {
        let mut config = config_with_key(ProviderKind::Cerebras, "csk-anything");
        config.translate.speed = 6;
        assert!(config.validate().is_err());

        config.translate.speed = 1;
        config.translate.batch_size = 0;
        assert!(config.validate().is_err());

        config.translate.batch_size = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_target_language_only_warns() {
        let mut config = config_with_key(ProviderKind::Cerebras, "csk-anything");
        config.translate.target_language = "pt".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!(" cerebras ".parse::<ProviderKind>().unwrap(), ProviderKind::Cerebras);
        assert!("openai".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_base_url_override_drops_trailing_slash() {
        let mut settings = ProviderSettings::new("m");
        assert_eq!(settings.resolved_base_url(ProviderKind::Cerebras), "https://api.cerebras.ai/v1");
        settings.base_url = Some("http://127.0.0.1:9000/".to_string());
        assert_eq!(settings.resolved_base_url(ProviderKind::Groq), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_save_and_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.translate.target_language = "fr".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.translate.target_language, "fr");
    }
}
