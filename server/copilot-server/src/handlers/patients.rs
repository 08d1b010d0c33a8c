use crate::error::{ApiError, ApiResult};
use crate::server::CopilotServer;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use database_layer::{NewPatient, Patient, PatientSearch, PATIENT_SEARCH_LIMIT};
use ehr_document::lenient;
use serde::{Deserialize, Serialize};
use tracing::info;

const PATIENTS_TABLE: &str = "patients";

#[derive(Debug, Default, Deserialize)]
pub struct PatientSearchQuery {
    pub name: Option<String>,
    /// `YYYY-MM-DD`
    pub dob: Option<String>,
}

impl PatientSearchQuery {
    fn into_filter(self) -> ApiResult<PatientSearch> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let dob = match self.dob.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(text) => Some(
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|_| ApiError::validation("dob must be formatted as YYYY-MM-DD"))?,
            ),
            None => None,
        };
        Ok(PatientSearch { name, dob })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub jkn_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub dob: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CreatePatientResponse {
    pub id: i32,
}

/// Search by name substring and exact date of birth, newest first.
pub async fn search_patients(
    State(server): State<CopilotServer>,
    Query(query): Query<PatientSearchQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    let filter = query.into_filter()?;
    let cache_filter = serde_json::to_value(&filter)?;

    let patients = server
        .cache
        .get_or_load(PATIENTS_TABLE, &cache_filter, || async {
            server.patients.search(&filter, PATIENT_SEARCH_LIMIT).await
        })
        .await?;

    Ok(Json(patients))
}

/// Register a patient ahead of a recording. A known JKN number returns the
/// existing patient's id.
pub async fn create_patient(
    State(server): State<CopilotServer>,
    Json(request): Json<CreatePatientRequest>,
) -> ApiResult<Json<CreatePatientResponse>> {
    let dob = match request.dob.as_deref() {
        Some(text) => Some(
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| ApiError::validation("dob must be formatted as YYYY-MM-DD"))?,
        ),
        None => None,
    };

    let resolved = server
        .resolver()
        .register(NewPatient {
            jkn_number: request.jkn_number,
            name: request.name.unwrap_or_default(),
            dob,
        })
        .await?;

    server.cache.clear_table(PATIENTS_TABLE);
    info!(patient_id = resolved.patient_id, resolution = ?resolved.resolution, "Patient registered");
    Ok(Json(CreatePatientResponse {
        id: resolved.patient_id,
    }))
}
