use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid strings.xml: {0}")]
    InvalidResource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No strings to translate")]
    NothingToTranslate,

    /// HTTP 401/403
    #[error("{provider} rejected the API key (HTTP {status}). Check your API key in the configuration")]
    Auth { provider: String, status: u16 },

    /// HTTP 404
    #[error("{provider} model or endpoint not available (HTTP 404): {message}")]
    NotFound { provider: String, message: String },

    /// HTTP 429
    #[error("{provider} rate limit reached (HTTP 429)")]
    RateLimited { provider: String },

    /// HTTP 5xx
    #[error("{provider} server error (HTTP {status}). Try again later")]
    Server { provider: String, status: u16 },

    #[error("{provider} network error: {message}")]
    Network { provider: String, message: String },

    #[error("{provider} returned an unusable response: {message}")]
    MalformedResponse { provider: String, message: String },

    /// Any other non-success HTTP status, e.g. 400
    #[error("{provider} HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },
}

impl TranslateError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Failures a run survives: the current window is marked errored and the
    /// scheduler moves on. Anything else ends the run early.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. }
                | Self::NotFound { .. }
                | Self::RateLimited { .. }
                | Self::Server { .. }
                | Self::Network { .. }
                | Self::MalformedResponse { .. }
                | Self::Api { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_classified() {
        let err = TranslateError::RateLimited { provider: "Groq".to_string() };
        assert!(err.is_rate_limited());
        assert!(err.is_classified());
    }

    #[test]
    fn test_config_error_is_not_classified() {
        let err = TranslateError::Config("API key is not set".to_string());
        assert!(!err.is_rate_limited());
        assert!(!err.is_classified());
    }

    #[test]
    fn test_auth_message_is_actionable() {
        let err = TranslateError::Auth { provider: "Gemini".to_string(), status: 403 };
        let message = err.to_string();
        assert!(message.contains("HTTP 403"));
        assert!(message.contains("Check your API key"));
    }
}
