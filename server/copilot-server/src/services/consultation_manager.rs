//! Recording a transcribed consultation.
//!
//! The transcript is the expensive part of a visit, so once it exists the
//! upload must not fail because of storage. Patient resolution or the row
//! insert failing yields a provisional id; the note and AI enrichment that
//! follow the insert are best effort.

use crate::services::{patient_context, patient_info, PatientPayload, PatientResolver, Resolution};
use chrono::Utc;
use database_layer::{
    AiDiagnosisUpdate, Consultation, ConsultationRepository, ConsultationStatus, NewConsultation,
    Patient, PatientRepository, QueryCache,
};
use diagnosis_service::{DiagnosisProvider, PatientContext};
use ehr_document::{EhrGenerator, EhrInput, PatientInfo, Vitals};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identifier returned to the client for a recorded consultation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConsultationId {
    Persisted(i32),
    /// Never stored; lets the client keep the transcript it was shown
    Provisional(Uuid),
}

impl fmt::Display for ConsultationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationId::Persisted(id) => write!(f, "{}", id),
            ConsultationId::Provisional(id) => write!(f, "provisional-{}", id),
        }
    }
}

/// Optional fields the clinician filled in next to the recording
#[derive(Debug, Clone, Default)]
pub struct ClinicalFields {
    pub diagnosis: Option<String>,
    pub coding: Option<String>,
    pub therapy: Vec<String>,
    pub vitals: Option<Vitals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordedConsultation {
    #[serde(rename = "consultationId")]
    pub consultation_id: ConsultationId,
    pub transcription: String,
    pub persisted: bool,
}

#[derive(Clone)]
pub struct ConsultationManager {
    resolver: PatientResolver,
    patients: Arc<dyn PatientRepository>,
    consultations: Arc<dyn ConsultationRepository>,
    diagnosis: Option<Arc<dyn DiagnosisProvider>>,
    ehr: Arc<EhrGenerator>,
    cache: Arc<QueryCache>,
}

impl ConsultationManager {
    pub fn new(
        patients: Arc<dyn PatientRepository>,
        consultations: Arc<dyn ConsultationRepository>,
        diagnosis: Option<Arc<dyn DiagnosisProvider>>,
        ehr: Arc<EhrGenerator>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            resolver: PatientResolver::new(patients.clone()),
            patients,
            consultations,
            diagnosis,
            ehr,
            cache,
        }
    }

    pub fn resolver(&self) -> &PatientResolver {
        &self.resolver
    }

    /// Store a consultation for `transcription`. Never fails: storage
    /// problems before the row exists produce a provisional id.
    pub async fn record(
        &self,
        doctor_id: i32,
        patient: Option<&PatientPayload>,
        transcription: String,
        fields: ClinicalFields,
    ) -> RecordedConsultation {
        let resolved = match self.resolver.resolve(patient).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(error = %e, "Patient resolution failed, returning provisional consultation");
                return provisional(transcription);
            }
        };
        if resolved.resolution != Resolution::ExistingId
            && resolved.resolution != Resolution::ExistingJkn
        {
            self.cache.clear_table("patients");
        }

        let new_consultation = NewConsultation {
            doctor_id,
            patient_id: resolved.patient_id,
            transcription: transcription.clone(),
            diagnosis: fields.diagnosis.clone(),
            ina_cbg_code: fields.coding.clone(),
            status: ConsultationStatus::Transcribed,
        };
        let consultation = match self.consultations.create_consultation(&new_consultation).await {
            Ok(consultation) => consultation,
            Err(e) => {
                error!(
                    patient_id = resolved.patient_id,
                    error = %e,
                    "Consultation insert failed, returning provisional consultation"
                );
                return provisional(transcription);
            }
        };
        self.cache.clear_table("consultations");
        info!(
            consultation_id = consultation.id,
            patient_id = consultation.patient_id,
            doctor_id,
            "Consultation recorded"
        );

        let patient = self.load_patient(consultation.patient_id).await;
        self.attach_note(&consultation, patient.as_ref(), &fields).await;
        self.attach_suggestion(&consultation, patient.as_ref()).await;

        RecordedConsultation {
            consultation_id: ConsultationId::Persisted(consultation.id),
            transcription,
            persisted: true,
        }
    }

    async fn load_patient(&self, patient_id: i32) -> Option<Patient> {
        match self.patients.find_by_id(patient_id).await {
            Ok(patient) => patient,
            Err(e) => {
                warn!(patient_id, error = %e, "Could not load patient for note");
                None
            }
        }
    }

    async fn attach_note(
        &self,
        consultation: &Consultation,
        patient: Option<&Patient>,
        fields: &ClinicalFields,
    ) {
        let input = EhrInput {
            consultation_id: consultation.id,
            date: consultation.created_at,
            transcription: consultation.transcription.clone(),
            diagnosis: fields.diagnosis.clone(),
            therapy: fields.therapy.clone(),
            vitals: fields.vitals.clone(),
            patient: patient.map(patient_info).unwrap_or_else(PatientInfo::default),
        };

        let html = match self.ehr.render_fixed(&input) {
            Ok(html) => html,
            Err(e) => {
                error!(consultation_id = consultation.id, error = %e, "EHR rendering failed");
                return;
            }
        };
        if let Err(e) = self.consultations.update_notes_html(consultation.id, &html).await {
            warn!(consultation_id = consultation.id, error = %e, "Storing EHR note failed");
        }
    }

    async fn attach_suggestion(&self, consultation: &Consultation, patient: Option<&Patient>) {
        let Some(provider) = self.diagnosis.as_ref() else {
            debug!(consultation_id = consultation.id, "Diagnosis enrichment disabled");
            return;
        };
        let Some(transcript) = consultation.transcription.as_deref() else {
            return;
        };

        let context = patient.map(patient_context).unwrap_or_else(PatientContext::default);
        let Some(suggestion) = provider.suggest_diagnosis(transcript, &context).await else {
            return;
        };

        let update = AiDiagnosisUpdate {
            payload: suggestion.payload,
            model: Some(suggestion.model),
            generated_at: Utc::now(),
        };
        match self.consultations.update_ai_diagnosis(consultation.id, &update).await {
            Ok(()) => self.cache.clear_table("consultations"),
            Err(e) => warn!(consultation_id = consultation.id, error = %e, "Storing AI suggestion failed"),
        }
    }
}

fn provisional(transcription: String) -> RecordedConsultation {
    RecordedConsultation {
        consultation_id: ConsultationId::Provisional(Uuid::new_v4()),
        transcription,
        persisted: false,
    }
}
