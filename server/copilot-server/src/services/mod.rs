pub mod consultation_manager;
pub mod patient_resolver;

pub use consultation_manager::{
    ClinicalFields, ConsultationId, ConsultationManager, RecordedConsultation,
};
pub use patient_resolver::{
    PatientPayload, PatientResolver, ResolveError, Resolution, ResolvedPatient,
    UNKNOWN_PATIENT_NAME,
};

use chrono::Utc;
use database_layer::Patient;
use diagnosis_service::PatientContext;
use ehr_document::{locale, PatientInfo};

/// Patient fields printed on notes
pub fn patient_info(patient: &Patient) -> PatientInfo {
    PatientInfo {
        name: Some(patient.name.clone()),
        jkn_number: patient.jkn_number.clone(),
        dob: patient.dob,
    }
}

/// Patient fields sent to the diagnosis provider, with age as of today in WIB
pub fn patient_context(patient: &Patient) -> PatientContext {
    let today = Utc::now().with_timezone(&locale::wib()).date_naive();
    PatientContext {
        name: Some(patient.name.clone()),
        jkn_number: patient.jkn_number.clone(),
        dob: patient.dob,
        age: patient.dob.and_then(|dob| locale::age_on(dob, today)),
    }
}
