//! Diagnosis enrichment backed by a generative-text model.
//!
//! Three calls share one client:
//!
//! - a best-effort suggestion stored on every new consultation
//! - a medical-record format that shapes the dynamic note
//! - a full clinical assessment, retried once and reported on failure
//!
//! Model output is free text; [`extract_json_object`] recovers the JSON
//! object from it.

pub mod config;
pub mod error;
pub mod extract;
pub mod prompts;
pub mod providers;
pub mod types;

pub use config::GeminiConfig;
pub use error::{DiagnosisError, DiagnosisResult};
pub use extract::{extract_json_object, JsonExtraction};
pub use providers::gemini::GeminiClient;
pub use providers::DiagnosisProvider;
pub use types::{ClinicalAssessment, DiagnosisSuggestion, PatientContext};
