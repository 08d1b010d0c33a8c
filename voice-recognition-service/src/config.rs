use crate::error::{TranscriptionError, TranscriptionResult};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";
pub const DEFAULT_LANGUAGE_CODE: &str = "id";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// AssemblyAI client configuration
#[derive(Debug, Clone)]
pub struct AssemblyAiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Language of every submitted job
    pub language_code: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Timeout applied to each individual HTTP request
    pub request_timeout: Duration,
}

impl AssemblyAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> TranscriptionResult<Self> {
        let api_key = std::env::var("ASSEMBLYAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TranscriptionError::Config("ASSEMBLYAI_API_KEY is not set".to_string()))?;

        let base_url = std::env::var("ASSEMBLYAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let language_code = std::env::var("ASSEMBLYAI_LANGUAGE")
            .unwrap_or_else(|_| DEFAULT_LANGUAGE_CODE.to_string());

        let poll_interval = std::env::var("ASSEMBLYAI_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        let max_poll_attempts = std::env::var("ASSEMBLYAI_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS);

        let request_timeout = std::env::var("ASSEMBLYAI_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let config = Self {
            base_url,
            api_key,
            language_code,
            poll_interval,
            max_poll_attempts,
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TranscriptionResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(TranscriptionError::Config("API key must not be empty".to_string()));
        }
        if self.max_poll_attempts == 0 {
            return Err(TranscriptionError::Config(
                "max poll attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
