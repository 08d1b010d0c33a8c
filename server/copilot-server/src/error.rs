use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use database_layer::DatabaseError;
use diagnosis_service::DiagnosisError;
use crate::services::ResolveError;
use ehr_document::EhrError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;
use voice_recognition_service::TranscriptionError;

/// Standard API error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Machine-readable error code
    pub error_type: String,
    /// Correlation id, also present in the server log line
    pub error_id: String,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Resource not found: {resource_type}")]
    NotFound { resource_type: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Diagnosis error: {0}")]
    Diagnosis(#[from] DiagnosisError),

    #[error("Document error: {0}")]
    Document(#[from] EhrError),

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Database(db_err) => match db_err {
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::UniqueViolation(_) => StatusCode::CONFLICT,
                DatabaseError::ConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Transcription(TranscriptionError::Config(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Transcription(_) => StatusCode::BAD_GATEWAY,
            ApiError::Diagnosis(DiagnosisError::EmptyTranscript) => StatusCode::BAD_REQUEST,
            ApiError::Diagnosis(DiagnosisError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Diagnosis(_) => StatusCode::BAD_GATEWAY,
            ApiError::Document(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::Authentication { .. } => "authentication_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Database(_) => "database_error",
            ApiError::Transcription(e) => e.code(),
            ApiError::Diagnosis(e) => e.code(),
            ApiError::Document(_) => "document_error",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::Internal { .. } => "internal_error",
        }
    }

    /// Message returned to the client. Provider errors pass through since
    /// they tell the user what to fix; storage details do not.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Validation { message }
            | ApiError::Authentication { message }
            | ApiError::BadRequest { message }
            | ApiError::ServiceUnavailable { message } => message.clone(),
            ApiError::NotFound { resource_type } => format!("{} not found", resource_type),
            ApiError::Database(db_err) => format_database_error(db_err),
            ApiError::Transcription(e) => e.to_string(),
            ApiError::Diagnosis(e) => e.to_string(),
            ApiError::Document(_) | ApiError::Internal { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

fn format_database_error(db_error: &DatabaseError) -> String {
    match db_error {
        DatabaseError::ConnectionFailed(_) => "Unable to connect to the database.".to_string(),
        DatabaseError::UniqueViolation(_) => "A record with these details already exists.".to_string(),
        DatabaseError::NotFound(what) => format!("{} not found", what),
        _ => "Database operation failed. Please try again.".to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();
        let detail = logger_redacted::redact(&self.to_string());

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %detail,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %detail,
                "Request rejected"
            );
        }

        let body = ApiErrorResponse {
            error: self.client_message(),
            error_type: self.error_type().to_string(),
            error_id,
        };

        (status_code, Json(body)).into_response()
    }
}

/// Convert anyhow errors to API errors
impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::Internal {
            message: error.to_string(),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::NameRequired => ApiError::validation("Name is required"),
            ResolveError::Storage(db_err) => ApiError::Database(db_err),
        }
    }
}

/// Convert serde JSON errors to API errors
impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::BadRequest {
            message: format!("Invalid JSON: {}", error),
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
