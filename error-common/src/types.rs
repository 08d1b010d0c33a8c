use thiserror::Error;

/// Errors surfaced by the server binary.
#[derive(Error, Debug)]
pub enum CopilotError {
    /// Missing or malformed environment configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database bootstrap failures
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Listener bind failures
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Failures while serving requests
    #[error("Server error: {0}")]
    ServerError(String),

    /// Logging subscriber could not be installed
    #[error("Logging error: {0}")]
    LoggingError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CopilotError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Short stable code used in structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            CopilotError::ConfigError(_) => "config",
            CopilotError::DatabaseError(_) => "database",
            CopilotError::NetworkError(_) => "network",
            CopilotError::ServerError(_) => "server",
            CopilotError::LoggingError(_) => "logging",
            CopilotError::Other(_) => "other",
        }
    }
}

/// Result type alias for process-level operations
pub type Result<T> = std::result::Result<T, CopilotError>;

/// Log an error with its code before the process exits.
pub fn log_error(context: &str, error: &CopilotError) {
    tracing::error!(
        context = context,
        error_code = error.code(),
        error = %error,
        "Clinical Copilot error occurred"
    );
}
