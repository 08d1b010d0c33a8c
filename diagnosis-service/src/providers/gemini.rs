//! Google Generative Language (Gemini) provider.
use crate::config::GeminiConfig;
use crate::error::{DiagnosisError, DiagnosisResult};
use crate::extract::{extract_json_object, JsonExtraction};
use crate::prompts::{self, ASSESSMENT_SAMPLING, FORMAT_SAMPLING, SUGGESTION_SAMPLING};
use crate::providers::DiagnosisProvider;
use crate::types::{
    ClinicalAssessment, Content, DiagnosisSuggestion, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, Part, PatientContext,
};
use async_trait::async_trait;
use ehr_document::MedicalRecordFormat;
use logger_redacted::redacted_warn;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> DiagnosisResult<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DiagnosisError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// One generateContent call; returns the first candidate's text.
    async fn generate(&self, prompt: &str, sampling: GenerationConfig) -> DiagnosisResult<String> {
        let request = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: sampling,
        };

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DiagnosisError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DiagnosisError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = provider_message(&body).unwrap_or_else(|| body.clone());
            return Err(DiagnosisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| DiagnosisError::InvalidPayload(e.to_string()))?;
        parsed.first_text().ok_or(DiagnosisError::EmptyResponse)
    }

    /// Generate, then pull the JSON object out of the reply.
    async fn generate_json(
        &self,
        prompt: &str,
        sampling: GenerationConfig,
    ) -> DiagnosisResult<(Value, String)> {
        let text = self.generate(prompt, sampling).await?;
        match extract_json_object(&text) {
            JsonExtraction::Parsed(value) => Ok((value, text)),
            JsonExtraction::NotFound => Err(DiagnosisError::NoJson),
            JsonExtraction::Malformed(e) => Err(DiagnosisError::MalformedJson(e)),
        }
    }

    async fn assess_once(&self, prompt: &str) -> DiagnosisResult<ClinicalAssessment> {
        let (value, _) = self.generate_json(prompt, ASSESSMENT_SAMPLING).await?;
        serde_json::from_value(value).map_err(|e| DiagnosisError::InvalidPayload(e.to_string()))
    }
}

#[async_trait]
impl DiagnosisProvider for GeminiClient {
    async fn suggest_diagnosis(
        &self,
        transcript: &str,
        patient: &PatientContext,
    ) -> Option<DiagnosisSuggestion> {
        let prompt = prompts::suggestion_prompt(transcript, patient);
        match self.generate_json(&prompt, SUGGESTION_SAMPLING).await {
            Ok((payload, raw_text)) => {
                debug!(model = %self.config.model, "Diagnosis suggestion parsed");
                Some(DiagnosisSuggestion {
                    payload,
                    raw_text,
                    model: self.config.model.clone(),
                })
            }
            Err(e) => {
                redacted_warn!("Diagnosis suggestion unavailable ({}): {}", e.code(), e);
                None
            }
        }
    }

    async fn medical_record_format(
        &self,
        diagnosis: &str,
        patient: &PatientContext,
        transcript: Option<&str>,
    ) -> Option<MedicalRecordFormat> {
        let prompt = prompts::medical_record_format_prompt(diagnosis, patient, transcript);
        let value = match self.generate_json(&prompt, FORMAT_SAMPLING).await {
            Ok((value, _)) => value,
            Err(e) => {
                redacted_warn!("Medical record format unavailable ({}): {}", e.code(), e);
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(format) => Some(format),
            Err(e) => {
                warn!(error = %e, "Medical record format has an unexpected shape");
                None
            }
        }
    }

    async fn assess(
        &self,
        transcript: &str,
        patient: &PatientContext,
    ) -> DiagnosisResult<ClinicalAssessment> {
        if transcript.trim().is_empty() {
            return Err(DiagnosisError::EmptyTranscript);
        }

        let prompt = prompts::assessment_prompt(transcript, patient);
        let attempts = self.config.assessment_attempts;
        let mut attempt = 1;
        loop {
            match self.assess_once(&prompt).await {
                Ok(assessment) => {
                    info!(attempt, model = %self.config.model, "Clinical assessment generated");
                    return Ok(assessment);
                }
                Err(e) if attempt < attempts && e.is_retryable() => {
                    redacted_warn!("Assessment attempt {} failed, retrying: {}", attempt, e);
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    redacted_warn!("Assessment failed after {} attempt(s): {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Gemini error bodies look like `{"error": {"message": "..."}}`
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
