use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagnosisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request to diagnosis provider failed: {0}")]
    Request(String),

    #[error("Diagnosis provider error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Diagnosis provider returned no content")]
    EmptyResponse,

    #[error("No JSON object in provider response")]
    NoJson,

    #[error("Malformed JSON in provider response: {0}")]
    MalformedJson(String),

    #[error("Provider JSON does not match the expected shape: {0}")]
    InvalidPayload(String),

    #[error("Transcript is empty")]
    EmptyTranscript,
}

impl DiagnosisError {
    /// Stable code for API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosisError::Config(_) => "diagnosis_config",
            DiagnosisError::Request(_) => "diagnosis_request_failed",
            DiagnosisError::Api { .. } => "diagnosis_provider_error",
            DiagnosisError::EmptyResponse => "diagnosis_empty_response",
            DiagnosisError::NoJson => "diagnosis_no_json",
            DiagnosisError::MalformedJson(_) => "diagnosis_malformed_json",
            DiagnosisError::InvalidPayload(_) => "diagnosis_invalid_payload",
            DiagnosisError::EmptyTranscript => "empty_transcript",
        }
    }

    /// Errors worth a second attempt: the provider may answer differently.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            DiagnosisError::Config(_) | DiagnosisError::EmptyTranscript
        )
    }
}

pub type DiagnosisResult<T> = Result<T, DiagnosisError>;
