use crate::handlers::{auth, consultations, health, patients};
use crate::server::CopilotServer;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

/// Route paths, relative to [`paths::API`]
pub mod paths {
    pub const API: &str = "/api";

    pub const HEALTH: &str = "/health";

    pub mod auth {
        pub const REGISTER: &str = "/auth/register";
        pub const LOGIN: &str = "/auth/login";
    }

    pub mod consultations {
        pub const LIST: &str = "/consultations";
        pub const TRANSCRIBE: &str = "/consultations/transcribe";
        pub const NOTES: &str = "/consultations/:id/notes";
        pub const DYNAMIC_NOTES: &str = "/consultations/:id/notes/dynamic";
        pub const ASSESSMENT: &str = "/consultations/:id/assessment";
        pub const AI_DIAGNOSIS: &str = "/consultations/:id/ai";
        pub const STATUS: &str = "/consultations/:id/status";
    }

    pub const PATIENTS: &str = "/patients";
}

pub fn health_routes() -> Router<CopilotServer> {
    Router::new().route(paths::HEALTH, get(health::health_check))
}

pub fn auth_routes() -> Router<CopilotServer> {
    Router::new()
        .route(paths::auth::REGISTER, post(auth::register))
        .route(paths::auth::LOGIN, post(auth::login))
}

/// Consultation routes. Every handler takes an `AuthContext`. The upload
/// route gets its own body limit for recordings.
pub fn consultation_routes(max_upload_bytes: usize) -> Router<CopilotServer> {
    use paths::consultations::*;

    Router::new()
        .route(
            TRANSCRIBE,
            post(consultations::transcribe).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(LIST, get(consultations::list_consultations))
        .route(NOTES, get(consultations::get_notes))
        .route(DYNAMIC_NOTES, post(consultations::dynamic_notes))
        .route(ASSESSMENT, post(consultations::assess_consultation))
        .route(AI_DIAGNOSIS, post(consultations::save_ai_diagnosis))
        .route(STATUS, patch(consultations::update_status))
}

pub fn patient_routes() -> Router<CopilotServer> {
    Router::new().route(
        paths::PATIENTS,
        get(patients::search_patients).post(patients::create_patient),
    )
}

/// Create all routes, nested under `/api`
pub fn create_routes(max_upload_bytes: usize) -> Router<CopilotServer> {
    let api = Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(consultation_routes(max_upload_bytes))
        .merge(patient_routes());

    Router::new().nest(paths::API, api)
}
