use thiserror::Error;

/// Failure at one stage of the upload, submit, poll protocol.
///
/// Each variant carries whatever the provider said, or the transport error
/// text when the provider could not be reached.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranscriptionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Transcription request failed: {0}")]
    SubmissionFailed(String),

    #[error("Status check failed: {0}")]
    StatusCheckFailed(String),

    #[error("Transcription failed: {0}")]
    ProviderReportedError(String),

    #[error("Transcription timeout after {attempts} status checks")]
    Timeout { attempts: u32 },
}

impl TranscriptionError {
    /// Stable code for API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            TranscriptionError::Config(_) => "transcription_config",
            TranscriptionError::UploadFailed(_) => "transcription_upload_failed",
            TranscriptionError::SubmissionFailed(_) => "transcription_submission_failed",
            TranscriptionError::StatusCheckFailed(_) => "transcription_status_failed",
            TranscriptionError::ProviderReportedError(_) => "transcription_provider_error",
            TranscriptionError::Timeout { .. } => "transcription_timeout",
        }
    }
}

pub type TranscriptionResult<T> = Result<T, TranscriptionError>;
