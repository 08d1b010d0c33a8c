//! Find-or-create patients from partial identifying data.
//!
//! Uploads carry whatever the clinician typed: sometimes a patient id from
//! the search box, sometimes only a JKN number or a name, sometimes nothing.
//! Resolution takes the first rule that applies:
//!
//! 1. an existing server id
//! 2. a JKN number, looked up and inserted when unknown
//! 3. a name alone, always inserted (names are never matched)
//! 4. a placeholder patient
//!
//! Failures in steps 1 to 3 are logged and fall through; only the
//! placeholder insert can fail the resolution.

use chrono::NaiveDate;
use database_layer::{DatabaseError, NewPatient, PatientRepository};
use ehr_document::lenient;
use logger_redacted::jkn_tag;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name stored for patients nobody identified
pub const UNKNOWN_PATIENT_NAME: &str = "Pasien Tidak Diketahui";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Name is required")]
    NameRequired,

    #[error("Patient storage failed: {0}")]
    Storage(#[from] DatabaseError),
}

/// Patient details sent with an upload, as loose as the client sends them
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PatientPayload {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<i32>,
    #[serde(default, rename = "patientId", deserialize_with = "opt_id")]
    pub patient_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub jkn_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_date")]
    pub dob: Option<NaiveDate>,
}

impl PatientPayload {
    fn server_id(&self) -> Option<i32> {
        self.id.or(self.patient_id)
    }
}

/// Which rule produced the patient id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    ExistingId,
    ExistingJkn,
    CreatedWithJkn,
    CreatedByName,
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPatient {
    pub patient_id: i32,
    pub resolution: Resolution,
}

#[derive(Clone)]
pub struct PatientResolver {
    patients: Arc<dyn PatientRepository>,
}

impl PatientResolver {
    pub fn new(patients: Arc<dyn PatientRepository>) -> Self {
        Self { patients }
    }

    pub async fn resolve(&self, payload: Option<&PatientPayload>) -> Result<ResolvedPatient, ResolveError> {
        let empty = PatientPayload::default();
        let payload = payload.unwrap_or(&empty);

        if let Some(id) = payload.server_id() {
            match self.patients.find_by_id(id).await {
                Ok(Some(patient)) => return Ok(resolved(patient.id, Resolution::ExistingId)),
                Ok(None) => debug!(patient_id = id, "Supplied patient id does not exist"),
                Err(e) => warn!(patient_id = id, error = %e, "Patient lookup by id failed"),
            }
        }

        if let Some(jkn) = payload.jkn_number.as_deref() {
            match self.find_or_create_by_jkn(jkn, payload).await {
                Ok(found) => return Ok(found),
                Err(e) => warn!(jkn = %jkn_tag(jkn), error = %e, "Patient resolution by JKN failed"),
            }
        }

        if let Some(name) = payload.name.as_deref() {
            let new_patient = NewPatient {
                jkn_number: None,
                name: name.to_string(),
                dob: payload.dob,
            };
            match self.patients.create_patient(&new_patient).await {
                Ok(patient) => return Ok(resolved(patient.id, Resolution::CreatedByName)),
                Err(e) => warn!(error = %e, "Creating patient by name failed"),
            }
        }

        let placeholder = NewPatient {
            jkn_number: None,
            name: UNKNOWN_PATIENT_NAME.to_string(),
            dob: None,
        };
        let patient = self.patients.create_patient(&placeholder).await?;
        info!(patient_id = patient.id, "Placeholder patient created");
        Ok(resolved(patient.id, Resolution::Placeholder))
    }

    async fn find_or_create_by_jkn(
        &self,
        jkn: &str,
        payload: &PatientPayload,
    ) -> Result<ResolvedPatient, DatabaseError> {
        match self.patients.find_by_jkn(jkn).await {
            Ok(Some(existing)) => return Ok(resolved(existing.id, Resolution::ExistingJkn)),
            Ok(None) => {}
            Err(e) => warn!(jkn = %jkn_tag(jkn), error = %e, "Patient lookup by JKN failed"),
        }

        let new_patient = NewPatient {
            jkn_number: Some(jkn.to_string()),
            name: payload
                .name
                .clone()
                .unwrap_or_else(|| UNKNOWN_PATIENT_NAME.to_string()),
            dob: payload.dob,
        };
        match self.patients.create_patient(&new_patient).await {
            Ok(patient) => {
                info!(patient_id = patient.id, jkn = %jkn_tag(jkn), "Patient created");
                Ok(resolved(patient.id, Resolution::CreatedWithJkn))
            }
            Err(e) if e.is_unique_violation() => self.winner_of_race(jkn).await,
            Err(e) => Err(e),
        }
    }

    /// Another request inserted the same JKN first; use its row.
    async fn winner_of_race(&self, jkn: &str) -> Result<ResolvedPatient, DatabaseError> {
        debug!(jkn = %jkn_tag(jkn), "Lost insert race on JKN, re-reading");
        self.patients
            .find_by_jkn(jkn)
            .await?
            .map(|p| resolved(p.id, Resolution::ExistingJkn))
            .ok_or_else(|| DatabaseError::NotFound(format!("patient {}", jkn_tag(jkn))))
    }

    /// Explicit registration. A known JKN number returns the existing patient.
    pub async fn register(&self, patient: NewPatient) -> Result<ResolvedPatient, ResolveError> {
        if patient.name.trim().is_empty() {
            return Err(ResolveError::NameRequired);
        }
        let patient = NewPatient {
            jkn_number: patient
                .jkn_number
                .map(|j| j.trim().to_string())
                .filter(|j| !j.is_empty()),
            name: patient.name.trim().to_string(),
            dob: patient.dob,
        };

        if let Some(jkn) = patient.jkn_number.as_deref() {
            if let Some(existing) = self.patients.find_by_jkn(jkn).await? {
                return Ok(resolved(existing.id, Resolution::ExistingJkn));
            }
        }

        match self.patients.create_patient(&patient).await {
            Ok(created) => {
                let resolution = if patient.jkn_number.is_some() {
                    Resolution::CreatedWithJkn
                } else {
                    Resolution::CreatedByName
                };
                Ok(resolved(created.id, resolution))
            }
            Err(e) if e.is_unique_violation() => match patient.jkn_number.as_deref() {
                Some(jkn) => Ok(self.winner_of_race(jkn).await?),
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }
}

fn resolved(patient_id: i32, resolution: Resolution) -> ResolvedPatient {
    ResolvedPatient {
        patient_id,
        resolution,
    }
}

/// Ids arrive as numbers or numeric strings from form data.
fn opt_id<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0))
}

/// `YYYY-MM-DD`; blank or unparseable dates count as absent.
fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient::opt_text(deserializer)?;
    Ok(text.and_then(|t| NaiveDate::parse_from_str(&t, "%Y-%m-%d").ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use database_layer::{DatabaseResult, InMemoryDatabase, Patient, PatientSearch};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn resolver() -> (Arc<InMemoryDatabase>, PatientResolver) {
        let db = Arc::new(InMemoryDatabase::new());
        (db.clone(), PatientResolver::new(db))
    }

    fn payload(value: Value) -> PatientPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn payload_is_lenient() {
        let p = payload(json!({"patientId": "12", "jkn_number": "  ", "name": "Budi", "dob": ""}));
        assert_eq!(p.server_id(), Some(12));
        assert_eq!(p.jkn_number, None);
        assert_eq!(p.dob, None);

        let p = payload(json!({"id": 3, "dob": "1990-05-17"}));
        assert_eq!(p.server_id(), Some(3));
        assert_eq!(p.dob, NaiveDate::from_ymd_opt(1990, 5, 17));
    }

    #[tokio::test]
    async fn same_jkn_resolves_to_same_patient() {
        let (db, resolver) = resolver();
        let p = payload(json!({"name": "Budi", "jkn_number": "123"}));

        let first = resolver.resolve(Some(&p)).await.unwrap();
        let second = resolver.resolve(Some(&p)).await.unwrap();

        assert_eq!(first.resolution, Resolution::CreatedWithJkn);
        assert_eq!(second.resolution, Resolution::ExistingJkn);
        assert_eq!(first.patient_id, second.patient_id);
        assert_eq!(db.patient_count(), 1);
    }

    #[tokio::test]
    async fn existing_id_wins_over_jkn() {
        let (db, resolver) = resolver();
        let first = resolver
            .resolve(Some(&payload(json!({"name": "Siti"}))))
            .await
            .unwrap();

        let again = resolver
            .resolve(Some(&payload(json!({"id": first.patient_id, "jkn_number": "999"}))))
            .await
            .unwrap();

        assert_eq!(again.resolution, Resolution::ExistingId);
        assert_eq!(again.patient_id, first.patient_id);
        assert_eq!(db.patient_count(), 1);
    }

    #[tokio::test]
    async fn unknown_id_falls_through_to_next_rule() {
        let (_, resolver) = resolver();
        let resolved = resolver
            .resolve(Some(&payload(json!({"id": 42, "name": "Ayu"}))))
            .await
            .unwrap();
        assert_eq!(resolved.resolution, Resolution::CreatedByName);
    }

    #[tokio::test]
    async fn names_are_never_matched() {
        let (db, resolver) = resolver();
        let p = payload(json!({"name": "Budi"}));

        let a = resolver.resolve(Some(&p)).await.unwrap();
        let b = resolver.resolve(Some(&p)).await.unwrap();

        assert_ne!(a.patient_id, b.patient_id);
        assert_eq!(db.patient_count(), 2);
    }

    #[tokio::test]
    async fn nothing_supplied_creates_placeholder_each_time() {
        let (db, resolver) = resolver();

        let a = resolver.resolve(None).await.unwrap();
        let b = resolver.resolve(Some(&PatientPayload::default())).await.unwrap();

        assert_eq!(a.resolution, Resolution::Placeholder);
        assert_ne!(a.patient_id, b.patient_id);
        assert_eq!(db.patient_count(), 2);
    }

    #[tokio::test]
    async fn registration_requires_name_and_reuses_jkn() {
        let (db, resolver) = resolver();

        let err = resolver
            .register(NewPatient {
                name: "  ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NameRequired));

        let new = NewPatient {
            jkn_number: Some("0001234567890".to_string()),
            name: "Budi".to_string(),
            dob: None,
        };
        let first = resolver.register(new.clone()).await.unwrap();
        let second = resolver.register(new).await.unwrap();
        assert_eq!(first.patient_id, second.patient_id);
        assert_eq!(db.patient_count(), 1);
    }

    /// Simulates losing the insert race: the lookup misses, the insert hits
    /// the unique key, and the re-read finds the other request's row.
    struct RacingPatients {
        inner: InMemoryDatabase,
        first_lookup_done: AtomicBool,
    }

    #[async_trait]
    impl PatientRepository for RacingPatients {
        async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Patient>> {
            PatientRepository::find_by_id(&self.inner, id).await
        }

        async fn find_by_jkn(&self, jkn_number: &str) -> DatabaseResult<Option<Patient>> {
            if !self.first_lookup_done.swap(true, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_jkn(jkn_number).await
        }

        async fn create_patient(&self, patient: &NewPatient) -> DatabaseResult<Patient> {
            self.inner.create_patient(patient).await
        }

        async fn search(&self, filter: &PatientSearch, limit: i64) -> DatabaseResult<Vec<Patient>> {
            self.inner.search(filter, limit).await
        }
    }

    #[tokio::test]
    async fn lost_insert_race_returns_winner() {
        let inner = InMemoryDatabase::new();
        let winner = inner
            .create_patient(&NewPatient {
                jkn_number: Some("123".to_string()),
                name: "Budi".to_string(),
                dob: None,
            })
            .await
            .unwrap();
        let racing = RacingPatients {
            inner,
            first_lookup_done: AtomicBool::new(false),
        };
        let resolver = PatientResolver::new(Arc::new(racing));

        let resolved = resolver
            .resolve(Some(&payload(json!({"jkn_number": "123", "name": "Budi"}))))
            .await
            .unwrap();

        assert_eq!(resolved.patient_id, winner.id);
        assert_eq!(resolved.resolution, Resolution::ExistingJkn);
    }

    /// Every JKN lookup fails; inserts can be made to fail too.
    struct FlakyLookup {
        inner: InMemoryDatabase,
        reject_jkn_inserts: bool,
    }

    #[async_trait]
    impl PatientRepository for FlakyLookup {
        async fn find_by_id(&self, id: i32) -> DatabaseResult<Option<Patient>> {
            PatientRepository::find_by_id(&self.inner, id).await
        }

        async fn find_by_jkn(&self, _jkn_number: &str) -> DatabaseResult<Option<Patient>> {
            Err(DatabaseError::QueryFailed("connection reset".to_string()))
        }

        async fn create_patient(&self, patient: &NewPatient) -> DatabaseResult<Patient> {
            if self.reject_jkn_inserts && patient.jkn_number.is_some() {
                return Err(DatabaseError::QueryFailed("insert rejected".to_string()));
            }
            self.inner.create_patient(patient).await
        }

        async fn search(&self, filter: &PatientSearch, limit: i64) -> DatabaseResult<Vec<Patient>> {
            self.inner.search(filter, limit).await
        }
    }

    async fn stored(resolver: &PatientResolver, id: i32) -> Patient {
        resolver.patients.find_by_id(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn failed_jkn_lookup_still_inserts_with_key_and_name() {
        let resolver = PatientResolver::new(Arc::new(FlakyLookup {
            inner: InMemoryDatabase::new(),
            reject_jkn_inserts: false,
        }));

        let resolved = resolver
            .resolve(Some(&payload(json!({"name": "Budi", "jkn_number": "123"}))))
            .await
            .unwrap();

        assert_eq!(resolved.resolution, Resolution::CreatedWithJkn);
        let patient = stored(&resolver, resolved.patient_id).await;
        assert_eq!(patient.name, "Budi");
        assert_eq!(patient.jkn_number.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn failed_jkn_insert_falls_back_to_name() {
        let resolver = PatientResolver::new(Arc::new(FlakyLookup {
            inner: InMemoryDatabase::new(),
            reject_jkn_inserts: true,
        }));

        let resolved = resolver
            .resolve(Some(&payload(json!({"name": "Budi", "jkn_number": "123"}))))
            .await
            .unwrap();

        assert_eq!(resolved.resolution, Resolution::CreatedByName);
        let patient = stored(&resolver, resolved.patient_id).await;
        assert_eq!(patient.name, "Budi");
        assert_eq!(patient.jkn_number, None);
    }
}
