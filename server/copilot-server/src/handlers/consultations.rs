use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthContext;
use crate::server::CopilotServer;
use crate::services::{patient_context, patient_info, ClinicalFields, PatientPayload, RecordedConsultation};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use database_layer::{
    AiDiagnosisUpdate, Consultation, ConsultationStatus, ConsultationSummary, Patient,
    RECENT_CONSULTATIONS_LIMIT,
};
use diagnosis_service::{ClinicalAssessment, PatientContext};
use ehr_document::{DynamicEhrInput, PatientInfo, Vitals};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const CONSULTATIONS_TABLE: &str = "consultations";

// =============================================================================
// UPLOAD
// =============================================================================

/// Multipart fields of a recording upload
#[derive(Debug, Default)]
pub struct TranscribeForm {
    pub audio: Option<Vec<u8>>,
    pub patient: Option<PatientPayload>,
    pub fields: ClinicalFields,
}

impl TranscribeForm {
    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = TranscribeForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "audio" {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read audio: {}", e)))?;
                form.audio = Some(bytes.to_vec());
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read field {}: {}", name, e)))?;
            form.apply_text_field(&name, &text);
        }

        Ok(form)
    }

    /// Unparseable JSON fields are ignored rather than failing the upload.
    pub fn apply_text_field(&mut self, name: &str, text: &str) {
        let trimmed = text.trim();
        match name {
            "patient" => match serde_json::from_str::<PatientPayload>(trimmed) {
                Ok(patient) => self.patient = Some(patient),
                Err(e) => warn!(error = %e, "Ignoring unparseable patient field"),
            },
            "diagnosis" => self.fields.diagnosis = non_empty(trimmed),
            "coding" => self.fields.coding = non_empty(trimmed),
            "therapy" | "therapy[]" => match serde_json::from_str::<Vec<Value>>(trimmed) {
                Ok(items) => self.fields.therapy.extend(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::String(s) => non_empty(s.trim()),
                            Value::Null => None,
                            other => Some(other.to_string()),
                        }),
                ),
                Err(_) => self.fields.therapy.extend(non_empty(trimmed)),
            },
            "vitals" => match serde_json::from_str::<Vitals>(trimmed) {
                Ok(vitals) => self.fields.vitals = Some(vitals),
                Err(e) => warn!(error = %e, "Ignoring unparseable vitals field"),
            },
            other => debug!(field = %other, "Ignoring unknown upload field"),
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Transcribe a recording and store it as a new consultation.
///
/// Transcription failures are reported (502); storage failures after a
/// successful transcription return a provisional id instead.
pub async fn transcribe(
    State(server): State<CopilotServer>,
    auth: AuthContext,
    multipart: Multipart,
) -> ApiResult<Json<RecordedConsultation>> {
    let form = TranscribeForm::from_multipart(multipart).await?;
    let audio = form
        .audio
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::validation("No audio file provided"))?;

    info!(
        doctor_id = auth.user_id,
        anonymous = auth.anonymous,
        audio_bytes = audio.len(),
        provider = server.transcriber.name(),
        "Transcription requested"
    );
    let transcript = server.transcriber.transcribe(audio).await?;
    info!(
        transcript_id = %transcript.id,
        poll_attempts = transcript.attempts,
        "Transcription completed"
    );

    let recorded = server
        .manager
        .record(auth.user_id, form.patient.as_ref(), transcript.text, form.fields)
        .await;
    if !recorded.persisted {
        warn!(
            consultation_id = %recorded.consultation_id,
            "Transcript returned without a stored consultation"
        );
    }

    Ok(Json(recorded))
}

// =============================================================================
// LISTING AND NOTES
// =============================================================================

/// Dashboard listing, newest first
pub async fn list_consultations(
    State(server): State<CopilotServer>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<ConsultationSummary>>> {
    let filter = json!({ "limit": RECENT_CONSULTATIONS_LIMIT });
    let summaries = server
        .cache
        .get_or_load(CONSULTATIONS_TABLE, &filter, || async {
            server.consultations.list_recent(RECENT_CONSULTATIONS_LIMIT).await
        })
        .await?;

    Ok(Json(summaries))
}

/// Stored note HTML. A missing consultation or note is a plain-text 404.
pub async fn get_notes(
    State(server): State<CopilotServer>,
    _auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Response> {
    let notes = server
        .consultations
        .find_by_id(id)
        .await?
        .and_then(|c| c.notes_html);

    Ok(match notes {
        Some(html) => Html(html).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Not found",
        )
            .into_response(),
    })
}

/// Render the format-driven note. The format comes from the diagnosis
/// provider when one is configured and the consultation has a diagnosis.
pub async fn dynamic_notes(
    State(server): State<CopilotServer>,
    _auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Html<String>> {
    let consultation = load_consultation(&server, id).await?;
    let patient = load_patient(&server, consultation.patient_id).await;
    let doctor_name = match server.users.find_by_id(consultation.doctor_id).await {
        Ok(user) => user.map(|u| u.name),
        Err(e) => {
            warn!(consultation_id = id, error = %e, "Could not load doctor for note");
            None
        }
    };

    let format = match (server.diagnosis.as_ref(), consultation.diagnosis.as_deref()) {
        (Some(provider), Some(diagnosis)) => {
            let context = patient.as_ref().map(patient_context).unwrap_or_default();
            provider
                .medical_record_format(diagnosis, &context, consultation.transcription.as_deref())
                .await
        }
        _ => None,
    };

    let input = DynamicEhrInput {
        consultation_id: consultation.id,
        created_at: consultation.created_at,
        transcription: consultation.transcription.clone(),
        diagnosis: consultation.diagnosis.clone(),
        patient: patient.as_ref().map(patient_info).unwrap_or_else(PatientInfo::default),
        doctor_name,
        printed_at: Utc::now(),
    };
    let html = server.ehr.render_dynamic(&input, format.as_ref())?;

    Ok(Html(html))
}

// =============================================================================
// AI RESULTS
// =============================================================================

/// Full clinical assessment of the stored transcript. The result is also
/// stored as the consultation's AI payload.
pub async fn assess_consultation(
    State(server): State<CopilotServer>,
    auth: AuthContext,
    Path(id): Path<i32>,
) -> ApiResult<Json<ClinicalAssessment>> {
    let provider = server
        .diagnosis
        .clone()
        .ok_or_else(|| ApiError::service_unavailable("AI diagnosis is not configured"))?;

    let consultation = load_consultation(&server, id).await?;
    let patient = load_patient(&server, consultation.patient_id).await;
    let context = patient.as_ref().map(patient_context).unwrap_or_else(PatientContext::default);
    let transcript = consultation.transcription.as_deref().unwrap_or_default();

    let assessment = provider.assess(transcript, &context).await?;
    info!(consultation_id = id, doctor_id = auth.user_id, "Assessment generated");

    let update = AiDiagnosisUpdate {
        payload: serde_json::to_value(&assessment)?,
        model: Some(provider.model().to_string()),
        generated_at: Utc::now(),
    };
    match server.consultations.update_ai_diagnosis(id, &update).await {
        Ok(()) => server.cache.clear_table(CONSULTATIONS_TABLE),
        Err(e) => warn!(consultation_id = id, error = %e, "Storing assessment failed"),
    }

    Ok(Json(assessment))
}

#[derive(Debug, Deserialize)]
pub struct SaveAiRequest {
    #[serde(default)]
    pub ai_diagnosis: Value,
    #[serde(default)]
    pub ai_model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ConsultationRef {
    pub id: i32,
}

/// Store an AI payload the clinician reviewed on the client.
pub async fn save_ai_diagnosis(
    State(server): State<CopilotServer>,
    _auth: AuthContext,
    Path(id): Path<i32>,
    Json(request): Json<SaveAiRequest>,
) -> ApiResult<Json<ConsultationRef>> {
    if request.ai_diagnosis.is_null() {
        return Err(ApiError::validation("ai_diagnosis is required"));
    }
    load_consultation(&server, id).await?;

    let update = AiDiagnosisUpdate {
        payload: request.ai_diagnosis,
        model: request
            .ai_model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
        generated_at: Utc::now(),
    };
    server.consultations.update_ai_diagnosis(id, &update).await?;
    server.cache.clear_table(CONSULTATIONS_TABLE);

    Ok(Json(ConsultationRef { id }))
}

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub id: i32,
    pub status: ConsultationStatus,
}

/// Move a consultation forward along PENDING → TRANSCRIBED → COMPLETED.
pub async fn update_status(
    State(server): State<CopilotServer>,
    auth: AuthContext,
    Path(id): Path<i32>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<StatusResponse>> {
    let next = ConsultationStatus::try_from(request.status.trim().to_uppercase())
        .map_err(|e| ApiError::validation(e.to_string()))?;
    let consultation = load_consultation(&server, id).await?;

    if !consultation.status.can_transition_to(next) {
        return Err(ApiError::bad_request(format!(
            "Cannot move consultation from {} to {}",
            consultation.status, next
        )));
    }

    server.consultations.update_status(id, next).await?;
    server.cache.clear_table(CONSULTATIONS_TABLE);
    info!(
        consultation_id = id,
        doctor_id = auth.user_id,
        from = %consultation.status,
        to = %next,
        "Consultation status changed"
    );

    Ok(Json(StatusResponse { id, status: next }))
}

async fn load_consultation(server: &CopilotServer, id: i32) -> ApiResult<Consultation> {
    server
        .consultations
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Consultation"))
}

async fn load_patient(server: &CopilotServer, patient_id: i32) -> Option<Patient> {
    match server.patients.find_by_id(patient_id).await {
        Ok(patient) => patient,
        Err(e) => {
            warn!(patient_id, error = %e, "Could not load patient");
            None
        }
    }
}
