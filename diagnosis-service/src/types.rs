use chrono::NaiveDate;
use ehr_document::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patient details embedded in prompts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jkn_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// Best-effort suggestion attached to a new consultation.
///
/// The payload is stored as-is, so it is kept as untyped JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisSuggestion {
    pub payload: Value,
    pub raw_text: String,
    pub model: String,
}

/// Full assessment requested explicitly for a consultation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClinicalAssessment {
    pub primary_diagnosis: String,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub differential_diagnosis: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub clinical_findings: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub recommended_tests: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub treatment_plan: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub medications: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub lifestyle_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub warning_signs: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub follow_up_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
}

// ============================================================================
// generateContent wire format
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest<'a> {
    pub contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content<'a> {
    pub parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub(crate) struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(rename = "topP")]
    pub top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`
    pub fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.trim().is_empty())
    }
}
