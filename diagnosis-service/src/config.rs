use crate::error::{DiagnosisError, DiagnosisResult};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_ASSESSMENT_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
    /// Attempts for a full clinical assessment. Suggestions are single-shot.
    pub assessment_attempts: u32,
    pub retry_delay: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            assessment_attempts: DEFAULT_ASSESSMENT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.assessment_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `GEMINI_API_KEY` is unset or blank; diagnosis
    /// enrichment is then disabled rather than misconfigured.
    pub fn from_env() -> DiagnosisResult<Option<Self>> {
        let Some(api_key) = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
        else {
            return Ok(None);
        };

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        config.request_timeout = std::env::var("GEMINI_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        config.validate()?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> DiagnosisResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(DiagnosisError::Config("API key must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(DiagnosisError::Config("model must not be empty".to_string()));
        }
        if self.assessment_attempts == 0 {
            return Err(DiagnosisError::Config(
                "assessment attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
