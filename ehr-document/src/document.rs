use crate::error::{EhrError, EhrResult};
use crate::format::MedicalRecordFormat;
use crate::lenient;
use crate::locale;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

const FIXED_TEMPLATE: &str = "ehr_fixed.html";
const DYNAMIC_TEMPLATE: &str = "ehr_dynamic.html";

/// Placeholder for any missing value
pub const PLACEHOLDER: &str = "—";
pub const CHIEF_COMPLAINT_CHARS: usize = 200;

const NO_DIAGNOSIS: &str = "Belum diisi";
const NO_DIAGNOSIS_DYNAMIC: &str = "Belum ditetapkan";
const NO_TRANSCRIPT: &str = "Tidak ada transkrip tersedia";
const DEFAULT_CATEGORY: &str = "general";
const DEFAULT_FOLLOW_UP: &str = "Kontrol kembali sesuai kebutuhan atau bila ada keluhan";
const DEFAULT_DOCTOR: &str = "Dr. (Sistem Asisten)";

/// `RM-<year>-<id padded to 6 digits>`
pub fn record_number(year: i32, consultation_id: i32) -> String {
    format!("RM-{:04}-{:06}", year, consultation_id)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub temperature: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub pulse: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub bp: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub faring: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientInfo {
    pub name: Option<String>,
    pub jkn_number: Option<String>,
    pub dob: Option<NaiveDate>,
}

/// Everything the fixed note needs about one consultation
#[derive(Debug, Clone)]
pub struct EhrInput {
    pub consultation_id: i32,
    pub date: DateTime<Utc>,
    pub transcription: Option<String>,
    pub diagnosis: Option<String>,
    pub therapy: Vec<String>,
    pub vitals: Option<Vitals>,
    pub patient: PatientInfo,
}

/// Inputs for the format-driven note
#[derive(Debug, Clone)]
pub struct DynamicEhrInput {
    pub consultation_id: i32,
    pub created_at: DateTime<Utc>,
    pub transcription: Option<String>,
    pub diagnosis: Option<String>,
    pub patient: PatientInfo,
    pub doctor_name: Option<String>,
    pub printed_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct FixedContext<'a> {
    patient_name: &'a str,
    date: String,
    record_number: String,
    jkn_number: &'a str,
    chief_complaint: String,
    temperature: &'a str,
    pulse: &'a str,
    blood_pressure: &'a str,
    pharynx: &'a str,
    diagnosis: &'a str,
    therapy: Vec<&'a str>,
}

#[derive(Serialize)]
struct DynamicContext<'a> {
    patient_name: &'a str,
    date_long: String,
    time: String,
    record_number: String,
    jkn_number: &'a str,
    dob: String,
    age: String,
    transcription: &'a str,
    has_vital_signs: bool,
    vital_signs: &'a [String],
    has_examination_sections: bool,
    examination_sections: &'a [String],
    category: &'a str,
    diagnosis: &'a str,
    diagnostic_tests: &'a [String],
    treatment_considerations: &'a [String],
    warning_signs: &'a [String],
    follow_up: &'a str,
    doctor_name: &'a str,
    printed_at: String,
}

fn text_or<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
}

fn list_or_empty(list: &Option<Vec<String>>) -> &[String] {
    list.as_deref().unwrap_or(&[])
}

/// Renders both note variants. Templates are compiled once; rendering is
/// pure and deterministic for identical inputs.
pub struct EhrGenerator {
    tera: Tera,
    offset: FixedOffset,
}

impl EhrGenerator {
    /// Generator rendering times in WIB
    pub fn new() -> EhrResult<Self> {
        Self::with_offset(locale::wib())
    }

    pub fn with_offset(offset: FixedOffset) -> EhrResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (FIXED_TEMPLATE, include_str!("../templates/ehr_fixed.html")),
            (DYNAMIC_TEMPLATE, include_str!("../templates/ehr_dynamic.html")),
        ])
        .map_err(|e| EhrError::TemplateParse(e.to_string()))?;
        Ok(Self { tera, offset })
    }

    pub fn render_fixed(&self, input: &EhrInput) -> EhrResult<String> {
        let date = input.date.with_timezone(&self.offset);
        let vitals = input.vitals.clone().unwrap_or_default();
        let complaint: String = input
            .transcription
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(CHIEF_COMPLAINT_CHARS)
            .collect();

        let context = FixedContext {
            patient_name: text_or(&input.patient.name, PLACEHOLDER),
            date: locale::short_date(&date),
            record_number: record_number(date.year(), input.consultation_id),
            jkn_number: text_or(&input.patient.jkn_number, PLACEHOLDER),
            chief_complaint: if complaint.trim().is_empty() {
                PLACEHOLDER.to_string()
            } else {
                complaint
            },
            temperature: text_or(&vitals.temperature, PLACEHOLDER),
            pulse: text_or(&vitals.pulse, PLACEHOLDER),
            blood_pressure: text_or(&vitals.bp, PLACEHOLDER),
            pharynx: text_or(&vitals.faring, PLACEHOLDER),
            diagnosis: text_or(&input.diagnosis, NO_DIAGNOSIS),
            therapy: input
                .therapy
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .collect(),
        };
        self.render(FIXED_TEMPLATE, &context)
    }

    pub fn render_dynamic(
        &self,
        input: &DynamicEhrInput,
        format: Option<&MedicalRecordFormat>,
    ) -> EhrResult<String> {
        let empty = MedicalRecordFormat::default();
        let format = format.unwrap_or(&empty);
        let created = input.created_at.with_timezone(&self.offset);
        let printed = input.printed_at.with_timezone(&self.offset);

        let (dob, age) = match input.patient.dob {
            Some(dob) => (
                locale::short_date(&dob),
                locale::age_on(dob, printed.date_naive())
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            ),
            None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        };

        let context = DynamicContext {
            patient_name: text_or(&input.patient.name, PLACEHOLDER),
            date_long: locale::long_date(&created),
            time: locale::time_of_day(&created),
            record_number: record_number(created.year(), input.consultation_id),
            jkn_number: text_or(&input.patient.jkn_number, PLACEHOLDER),
            dob,
            age,
            transcription: text_or(&input.transcription, NO_TRANSCRIPT),
            has_vital_signs: format.vital_signs_needed.is_some(),
            vital_signs: list_or_empty(&format.vital_signs_needed),
            has_examination_sections: format.examination_sections.is_some(),
            examination_sections: list_or_empty(&format.examination_sections),
            category: text_or(&format.diagnosis_category, DEFAULT_CATEGORY),
            diagnosis: text_or(&input.diagnosis, NO_DIAGNOSIS_DYNAMIC),
            diagnostic_tests: list_or_empty(&format.diagnostic_tests),
            treatment_considerations: list_or_empty(&format.treatment_considerations),
            warning_signs: list_or_empty(&format.warning_signs),
            follow_up: text_or(&format.follow_up_recommendations, DEFAULT_FOLLOW_UP),
            doctor_name: text_or(&input.doctor_name, DEFAULT_DOCTOR),
            printed_at: locale::date_time(&printed),
        };
        self.render(DYNAMIC_TEMPLATE, &context)
    }

    fn render<T: Serialize>(&self, template: &str, context: &T) -> EhrResult<String> {
        let context = Context::from_serialize(context)
            .map_err(|e| EhrError::TemplateRender(e.to_string()))?;
        let html = self.tera.render(template, &context)?;
        tracing::debug!(template, bytes = html.len(), "EHR document rendered");
        Ok(html)
    }
}
