use crate::error::DatabaseResult;
use crate::models::*;
use async_trait::async_trait;

/// Maximum rows returned by the dashboard listing
pub const RECENT_CONSULTATIONS_LIMIT: i64 = 100;
/// Maximum rows returned by patient search
pub const PATIENT_SEARCH_LIMIT: i64 = 50;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `UniqueViolation` when the email is taken.
    async fn create_user(&self, user: &NewUser) -> DatabaseResult<User>;
    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Patient>>;
    async fn find_by_jkn(&self, jkn_number: &str) -> DatabaseResult<Option<Patient>>;
    /// Fails with `UniqueViolation` when a non-null JKN number already exists.
    async fn create_patient(&self, patient: &NewPatient) -> DatabaseResult<Patient>;
    /// Case-insensitive substring match on name, exact match on dob, newest first.
    async fn search(&self, filter: &PatientSearch, limit: i64) -> DatabaseResult<Vec<Patient>>;
}

#[async_trait]
pub trait ConsultationRepository: Send + Sync {
    async fn create_consultation(&self, consultation: &NewConsultation) -> DatabaseResult<Consultation>;
    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Consultation>>;
    async fn update_notes_html(&self, id: i32, notes_html: &str) -> DatabaseResult<()>;
    async fn update_ai_diagnosis(&self, id: i32, update: &AiDiagnosisUpdate) -> DatabaseResult<()>;
    async fn update_status(&self, id: i32, status: ConsultationStatus) -> DatabaseResult<()>;
    /// Newest first, joined with patient and doctor names.
    async fn list_recent(&self, limit: i64) -> DatabaseResult<Vec<ConsultationSummary>>;
}
