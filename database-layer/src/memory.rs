//! In-memory implementation of every repository trait.
//!
//! Used by tests and by the server's `--in-memory` demo mode. Enforces the
//! same constraints the Postgres schema does: unique emails, unique non-null
//! JKN numbers, and foreign keys from consultations to users and patients.

use crate::error::{DatabaseError, DatabaseResult};
use crate::models::*;
use crate::repository::*;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    patients: Vec<Patient>,
    consultations: Vec<Consultation>,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    tables: RwLock<Tables>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient_count(&self) -> usize {
        self.tables.read().patients.len()
    }

    pub fn consultation_count(&self) -> usize {
        self.tables.read().consultations.len()
    }

    fn with_consultation<F>(&self, id: i32, apply: F) -> DatabaseResult<()>
    where
        F: FnOnce(&mut Consultation),
    {
        let mut tables = self.tables.write();
        let consultation = tables
            .consultations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("consultation {}", id)))?;
        apply(consultation);
        Ok(())
    }
}

fn next_id(len: usize) -> DatabaseResult<i32> {
    i32::try_from(len)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| DatabaseError::QueryFailed("id sequence exhausted".to_string()))
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn create_user(&self, user: &NewUser) -> DatabaseResult<User> {
        let mut tables = self.tables.write();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }
        let created = User {
            id: next_id(tables.users.len())?,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            name: user.name.clone(),
            role: "DOCTOR".to_string(),
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<User>> {
        Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        Ok(self.tables.read().users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl PatientRepository for InMemoryDatabase {
    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Patient>> {
        Ok(self.tables.read().patients.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_jkn(&self, jkn_number: &str) -> DatabaseResult<Option<Patient>> {
        Ok(self
            .tables
            .read()
            .patients
            .iter()
            .find(|p| p.jkn_number.as_deref() == Some(jkn_number))
            .cloned())
    }

    async fn create_patient(&self, patient: &NewPatient) -> DatabaseResult<Patient> {
        let mut tables = self.tables.write();
        if let Some(jkn) = &patient.jkn_number {
            if tables.patients.iter().any(|p| p.jkn_number.as_ref() == Some(jkn)) {
                return Err(DatabaseError::UniqueViolation("patients_jkn_number_key".to_string()));
            }
        }
        let created = Patient {
            id: next_id(tables.patients.len())?,
            jkn_number: patient.jkn_number.clone(),
            name: patient.name.clone(),
            dob: patient.dob,
            created_at: Utc::now(),
        };
        tables.patients.push(created.clone());
        Ok(created)
    }

    async fn search(&self, filter: &PatientSearch, limit: i64) -> DatabaseResult<Vec<Patient>> {
        let needle = filter.name.as_ref().map(|n| n.to_lowercase());
        let tables = self.tables.read();
        let mut found: Vec<Patient> = tables
            .patients
            .iter()
            .filter(|p| {
                needle
                    .as_ref()
                    .map_or(true, |n| p.name.to_lowercase().contains(n.as_str()))
            })
            .filter(|p| filter.dob.map_or(true, |dob| p.dob == Some(dob)))
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        found.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(found)
    }
}

#[async_trait]
impl ConsultationRepository for InMemoryDatabase {
    async fn create_consultation(&self, consultation: &NewConsultation) -> DatabaseResult<Consultation> {
        let mut tables = self.tables.write();
        if !tables.users.iter().any(|u| u.id == consultation.doctor_id) {
            return Err(DatabaseError::QueryFailed(format!(
                "doctor {} does not exist",
                consultation.doctor_id
            )));
        }
        if !tables.patients.iter().any(|p| p.id == consultation.patient_id) {
            return Err(DatabaseError::QueryFailed(format!(
                "patient {} does not exist",
                consultation.patient_id
            )));
        }
        let created = Consultation {
            id: next_id(tables.consultations.len())?,
            doctor_id: consultation.doctor_id,
            patient_id: consultation.patient_id,
            diagnosis: consultation.diagnosis.clone(),
            transcription: Some(consultation.transcription.clone()),
            ina_cbg_code: consultation.ina_cbg_code.clone(),
            status: consultation.status,
            notes_html: None,
            ai_diagnosis: None,
            ai_generated_at: None,
            ai_model: None,
            created_at: Utc::now(),
        };
        tables.consultations.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Consultation>> {
        Ok(self
            .tables
            .read()
            .consultations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn update_notes_html(&self, id: i32, notes_html: &str) -> DatabaseResult<()> {
        self.with_consultation(id, |c| c.notes_html = Some(notes_html.to_string()))
    }

    async fn update_ai_diagnosis(&self, id: i32, update: &AiDiagnosisUpdate) -> DatabaseResult<()> {
        self.with_consultation(id, |c| {
            c.ai_diagnosis = Some(update.payload.clone());
            c.ai_model = update.model.clone();
            c.ai_generated_at = Some(update.generated_at);
        })
    }

    async fn update_status(&self, id: i32, status: ConsultationStatus) -> DatabaseResult<()> {
        self.with_consultation(id, |c| c.status = status)
    }

    async fn list_recent(&self, limit: i64) -> DatabaseResult<Vec<ConsultationSummary>> {
        let tables = self.tables.read();
        let mut rows: Vec<ConsultationSummary> = tables
            .consultations
            .iter()
            .filter_map(|c| {
                let patient = tables.patients.iter().find(|p| p.id == c.patient_id)?;
                let doctor = tables.users.iter().find(|u| u.id == c.doctor_id);
                Some(ConsultationSummary {
                    id: c.id,
                    created_at: c.created_at,
                    status: c.status,
                    diagnosis: c.diagnosis.clone(),
                    ina_cbg_code: c.ina_cbg_code.clone(),
                    patient_id: patient.id,
                    patient_name: patient.name.clone(),
                    jkn_number: patient.jkn_number.clone(),
                    dob: patient.dob,
                    doctor_name: doctor.map(|d| d.name.clone()),
                })
            })
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}
