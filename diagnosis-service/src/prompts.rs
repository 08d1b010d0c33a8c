//! Prompt builders and the sampling settings that go with each prompt.

use crate::types::{GenerationConfig, PatientContext};

/// Transcript excerpt length for the record-format prompt
pub const FORMAT_TRANSCRIPT_CHARS: usize = 500;

const NOT_AVAILABLE: &str = "N/A";

pub(crate) const SUGGESTION_SAMPLING: GenerationConfig = GenerationConfig {
    temperature: 0.1,
    top_k: 40,
    top_p: 0.95,
    max_output_tokens: 500,
};

pub(crate) const FORMAT_SAMPLING: GenerationConfig = GenerationConfig {
    temperature: 0.2,
    top_k: 40,
    top_p: 0.95,
    max_output_tokens: 1024,
};

pub(crate) const ASSESSMENT_SAMPLING: GenerationConfig = GenerationConfig {
    temperature: 0.3,
    top_k: 40,
    top_p: 0.95,
    max_output_tokens: 1500,
};

pub fn suggestion_prompt(transcript: &str, patient: &PatientContext) -> String {
    let patient_json = serde_json::to_string(patient).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are a clinical assistant. Given patient data and transcript, return JSON: \
         {{\"primary_diagnosis\":\"string\", \"differential\":[{{\"diagnosis\":\"string\",\"confidence\":0.8}}], \
         \"overall_confidence\":0.9, \"recommendations\":\"string\"}}\n\n\
         Patient: {}\nTranscript: {}\nReturn only valid JSON:",
        patient_json, transcript
    )
}

fn age_line(patient: &PatientContext) -> String {
    patient
        .age
        .map(|age| age.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn medical_record_format_prompt(
    diagnosis: &str,
    patient: &PatientContext,
    transcript: Option<&str>,
) -> String {
    let excerpt: String = match transcript {
        Some(t) if !t.trim().is_empty() => t.chars().take(FORMAT_TRANSCRIPT_CHARS).collect(),
        _ => NOT_AVAILABLE.to_string(),
    };

    format!(
        r#"Anda adalah asisten medis profesional. Berdasarkan diagnosis berikut, hasilkan struktur rekam medis elektronik yang sesuai dalam format JSON.

DIAGNOSIS: {diagnosis}

DATA PASIEN:
- Nama: {name}
- Usia: {age} tahun

TRANSKRIP KONSULTASI (ringkas):
{excerpt}

Berdasarkan diagnosis tersebut, hasilkan JSON dengan struktur berikut:
{{
  "diagnosis_category": "kategori penyakit (e.g., respiratory, cardiovascular, gastrointestinal)",
  "vital_signs_needed": ["list vital signs yang harus dicatat untuk penyakit ini"],
  "examination_sections": ["list pemeriksaan fisik yang relevan"],
  "diagnostic_tests": ["list tes diagnostik yang disarankan"],
  "treatment_considerations": ["list pertimbangan terapi"],
  "warning_signs": ["tanda-tanda bahaya yang harus dipantau"],
  "follow_up_recommendations": "rekomendasi follow-up",
  "medical_record_template": "template ringkas untuk rekam medis"
}}

Berikan HANYA JSON, tanpa teks tambahan."#,
        diagnosis = diagnosis,
        name = patient.name.as_deref().unwrap_or(NOT_AVAILABLE),
        age = age_line(patient),
        excerpt = excerpt,
    )
}

pub fn assessment_prompt(transcript: &str, patient: &PatientContext) -> String {
    format!(
        r#"Anda adalah dokter konsultan berpengalaman. Analisis transkripsi konsultasi pasien berikut dan berikan diagnosis serta rekomendasi.

DATA PASIEN:
- Nama: {name}
- Usia: {age} tahun

TRANSKRIP KONSULTASI:
{transcript}

Berdasarkan informasi di atas, hasilkan JSON dengan format:
{{
  "primary_diagnosis": "diagnosis utama dalam bahasa Indonesia",
  "differential_diagnosis": ["diagnosis alternatif 1", "diagnosis alternatif 2"],
  "severity": "ringan/sedang/berat",
  "clinical_findings": ["temuan klinis 1", "temuan klinis 2"],
  "recommended_tests": ["tes diagnostik 1", "tes diagnostik 2"],
  "treatment_plan": ["rencana terapi 1", "rencana terapi 2"],
  "medications": ["nama obat 1 - dosis", "nama obat 2 - dosis"],
  "lifestyle_recommendations": ["rekomendasi gaya hidup 1", "rekomendasi gaya hidup 2"],
  "warning_signs": ["tanda bahaya yang memerlukan perhatian medis segera"],
  "follow_up_date": "rekomendasi follow-up (e.g., dalam 3 hari)",
  "notes": "catatan tambahan untuk pasien"
}}

Berikan HANYA JSON, tanpa teks tambahan. Pastikan respons medis akurat dan konservatif."#,
        name = patient.name.as_deref().unwrap_or(NOT_AVAILABLE),
        age = age_line(patient),
        transcript = transcript,
    )
}
