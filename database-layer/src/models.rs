// Database models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;

/// Doctor or staff account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Patient {
    pub id: i32,
    /// National health insurance (JKN/BPJS) number, unique when present
    pub jkn_number: Option<String>,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPatient {
    pub jkn_number: Option<String>,
    pub name: String,
    pub dob: Option<NaiveDate>,
}

/// Filter for the patient search endpoint. Serialized as the cache key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
}

#[derive(Debug, Error)]
#[error("unknown consultation status: {0}")]
pub struct UnknownStatus(pub String);

/// Consultation lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsultationStatus {
    Pending,
    Transcribed,
    Completed,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "PENDING",
            ConsultationStatus::Transcribed => "TRANSCRIBED",
            ConsultationStatus::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(&self, next: ConsultationStatus) -> bool {
        next >= *self
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ConsultationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PENDING" => Ok(ConsultationStatus::Pending),
            "TRANSCRIBED" => Ok(ConsultationStatus::Transcribed),
            "COMPLETED" => Ok(ConsultationStatus::Completed),
            _ => Err(UnknownStatus(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Consultation {
    pub id: i32,
    pub doctor_id: i32,
    pub patient_id: i32,
    pub diagnosis: Option<String>,
    pub transcription: Option<String>,
    pub ina_cbg_code: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ConsultationStatus,
    pub notes_html: Option<String>,
    pub ai_diagnosis: Option<serde_json::Value>,
    pub ai_generated_at: Option<DateTime<Utc>>,
    pub ai_model: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConsultation {
    pub doctor_id: i32,
    pub patient_id: i32,
    pub transcription: String,
    pub diagnosis: Option<String>,
    pub ina_cbg_code: Option<String>,
    pub status: ConsultationStatus,
}

/// AI payload attached to an existing consultation
#[derive(Debug, Clone)]
pub struct AiDiagnosisUpdate {
    pub payload: serde_json::Value,
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Dashboard row: a consultation joined with its patient and doctor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ConsultationSummary {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: ConsultationStatus,
    pub diagnosis: Option<String>,
    pub ina_cbg_code: Option<String>,
    pub patient_id: i32,
    pub patient_name: String,
    pub jkn_number: Option<String>,
    pub dob: Option<NaiveDate>,
    pub doctor_name: Option<String>,
}
