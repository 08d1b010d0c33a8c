//! Postgres implementations of the repository traits.

use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::*;
use crate::repository::*;
use async_trait::async_trait;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, created_at";
const PATIENT_COLUMNS: &str = "id, jkn_number, name, dob, created_at";
const CONSULTATION_COLUMNS: &str = "id, doctor_id, patient_id, diagnosis, transcription, ina_cbg_code, \
     status, notes_html, ai_diagnosis, ai_generated_at, ai_model, created_at";

fn ensure_updated(rows: u64, id: i32) -> DatabaseResult<()> {
    if rows == 0 {
        return Err(DatabaseError::NotFound(format!("consultation {}", id)));
    }
    Ok(())
}

pub struct PgUserRepository {
    db: DatabasePool,
}

impl PgUserRepository {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &NewUser) -> DatabaseResult<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .fetch_one(self.db.pool())
            .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(user)
    }
}

pub struct PgPatientRepository {
    db: DatabasePool,
}

impl PgPatientRepository {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PatientRepository for PgPatientRepository {
    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Patient>> {
        let sql = format!("SELECT {} FROM patients WHERE id = $1", PATIENT_COLUMNS);
        let patient = sqlx::query_as::<_, Patient>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(patient)
    }

    async fn find_by_jkn(&self, jkn_number: &str) -> DatabaseResult<Option<Patient>> {
        let sql = format!("SELECT {} FROM patients WHERE jkn_number = $1", PATIENT_COLUMNS);
        let patient = sqlx::query_as::<_, Patient>(&sql)
            .bind(jkn_number)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(patient)
    }

    async fn create_patient(&self, patient: &NewPatient) -> DatabaseResult<Patient> {
        let sql = format!(
            "INSERT INTO patients (jkn_number, name, dob) VALUES ($1, $2, $3) RETURNING {}",
            PATIENT_COLUMNS
        );
        let created = sqlx::query_as::<_, Patient>(&sql)
            .bind(&patient.jkn_number)
            .bind(&patient.name)
            .bind(patient.dob)
            .fetch_one(self.db.pool())
            .await?;
        Ok(created)
    }

    async fn search(&self, filter: &PatientSearch, limit: i64) -> DatabaseResult<Vec<Patient>> {
        let name_pattern = filter.name.as_deref().map(contains_pattern);
        let sql = format!(
            "SELECT {} FROM patients \
             WHERE ($1::TEXT IS NULL OR name ILIKE $1 ESCAPE '\\') \
               AND ($2::DATE IS NULL OR dob = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3",
            PATIENT_COLUMNS
        );
        let patients = sqlx::query_as::<_, Patient>(&sql)
            .bind(name_pattern)
            .bind(filter.dob)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;
        Ok(patients)
    }
}

/// `ILIKE` pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct PgConsultationRepository {
    db: DatabasePool,
}

impl PgConsultationRepository {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConsultationRepository for PgConsultationRepository {
    async fn create_consultation(&self, consultation: &NewConsultation) -> DatabaseResult<Consultation> {
        let sql = format!(
            "INSERT INTO consultations (doctor_id, patient_id, transcription, diagnosis, ina_cbg_code, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CONSULTATION_COLUMNS
        );
        let created = sqlx::query_as::<_, Consultation>(&sql)
            .bind(consultation.doctor_id)
            .bind(consultation.patient_id)
            .bind(&consultation.transcription)
            .bind(&consultation.diagnosis)
            .bind(&consultation.ina_cbg_code)
            .bind(consultation.status.as_str())
            .fetch_one(self.db.pool())
            .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Consultation>> {
        let sql = format!("SELECT {} FROM consultations WHERE id = $1", CONSULTATION_COLUMNS);
        let consultation = sqlx::query_as::<_, Consultation>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(consultation)
    }

    async fn update_notes_html(&self, id: i32, notes_html: &str) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE consultations SET notes_html = $1 WHERE id = $2")
            .bind(notes_html)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        ensure_updated(result.rows_affected(), id)
    }

    async fn update_ai_diagnosis(&self, id: i32, update: &AiDiagnosisUpdate) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE consultations SET ai_diagnosis = $1, ai_model = $2, ai_generated_at = $3 WHERE id = $4",
        )
        .bind(&update.payload)
        .bind(&update.model)
        .bind(update.generated_at)
        .bind(id)
        .execute(self.db.pool())
        .await?;
        ensure_updated(result.rows_affected(), id)
    }

    async fn update_status(&self, id: i32, status: ConsultationStatus) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE consultations SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(self.db.pool())
            .await?;
        ensure_updated(result.rows_affected(), id)
    }

    async fn list_recent(&self, limit: i64) -> DatabaseResult<Vec<ConsultationSummary>> {
        let rows = sqlx::query_as::<_, ConsultationSummary>(
            "SELECT c.id, c.created_at, c.status, c.diagnosis, c.ina_cbg_code, \
                    p.id AS patient_id, p.name AS patient_name, p.jkn_number, p.dob, \
                    u.name AS doctor_name \
             FROM consultations c \
             JOIN patients p ON p.id = c.patient_id \
             LEFT JOIN users u ON u.id = c.doctor_id \
             ORDER BY c.created_at DESC, c.id DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }
}
