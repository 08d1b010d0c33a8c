pub mod gemini;

use crate::error::DiagnosisResult;
use crate::types::{ClinicalAssessment, DiagnosisSuggestion, PatientContext};
use async_trait::async_trait;
use ehr_document::MedicalRecordFormat;

/// Generative-text backend for consultation enrichment
#[async_trait]
pub trait DiagnosisProvider: Send + Sync {
    /// Suggestion stored alongside a new consultation. Never fails: any
    /// provider or parse problem is logged and yields `None`.
    async fn suggest_diagnosis(
        &self,
        transcript: &str,
        patient: &PatientContext,
    ) -> Option<DiagnosisSuggestion>;

    /// Disease-specific record structure for the dynamic note. Best effort
    /// like [`DiagnosisProvider::suggest_diagnosis`].
    async fn medical_record_format(
        &self,
        diagnosis: &str,
        patient: &PatientContext,
        transcript: Option<&str>,
    ) -> Option<MedicalRecordFormat>;

    /// Full assessment requested by a clinician; failures are reported.
    async fn assess(
        &self,
        transcript: &str,
        patient: &PatientContext,
    ) -> DiagnosisResult<ClinicalAssessment>;

    /// Model identifier recorded with stored results
    fn model(&self) -> &str;
}
