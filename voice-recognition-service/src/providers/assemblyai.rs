//! AssemblyAI provider: upload, submit, then poll until the job settles.
use crate::config::AssemblyAiConfig;
use crate::error::{TranscriptionError, TranscriptionResult};
use crate::providers::TranscriptionProvider;
use crate::transcription::{JobStatus, Transcript, TranscriptJob, TranscriptRequest, UploadResponse};
use async_trait::async_trait;
use logger_redacted::redacted_warn;
use reqwest::{header, Client, Response};
use tracing::{debug, info};

pub struct AssemblyAiClient {
    http: Client,
    config: AssemblyAiConfig,
}

impl AssemblyAiClient {
    pub fn new(config: AssemblyAiConfig) -> TranscriptionResult<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TranscriptionError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn upload(&self, audio: Vec<u8>) -> TranscriptionResult<String> {
        let size = audio.len();
        let response = self
            .http
            .post(self.url("/v2/upload"))
            .header(header::AUTHORIZATION, &self.config.api_key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(|e| TranscriptionError::UploadFailed(e.to_string()))?;

        let body: UploadResponse = read_json(response)
            .await
            .map_err(TranscriptionError::UploadFailed)?;
        debug!(bytes = size, "Audio uploaded");
        Ok(body.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> TranscriptionResult<String> {
        let request = TranscriptRequest {
            audio_url,
            language_code: &self.config.language_code,
        };
        let response = self
            .http
            .post(self.url("/v2/transcript"))
            .header(header::AUTHORIZATION, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranscriptionError::SubmissionFailed(e.to_string()))?;

        let job: TranscriptJob = read_json(response)
            .await
            .map_err(TranscriptionError::SubmissionFailed)?;
        Ok(job.id)
    }

    async fn check(&self, job_id: &str) -> TranscriptionResult<TranscriptJob> {
        let response = self
            .http
            .get(self.url(&format!("/v2/transcript/{}", job_id)))
            .header(header::AUTHORIZATION, &self.config.api_key)
            .send()
            .await
            .map_err(|e| TranscriptionError::StatusCheckFailed(e.to_string()))?;

        read_json(response)
            .await
            .map_err(TranscriptionError::StatusCheckFailed)
    }

    async fn poll(&self, job_id: &str) -> TranscriptionResult<Transcript> {
        let max_attempts = self.config.max_poll_attempts;

        for attempt in 1..=max_attempts {
            let job = self.check(job_id).await?;
            debug!(job_id, attempt, status = ?job.status, "Transcription status checked");

            match job.status {
                JobStatus::Completed => {
                    return Ok(Transcript {
                        id: job.id,
                        text: job.text.unwrap_or_default(),
                        language_code: self.config.language_code.clone(),
                        attempts: attempt,
                    });
                }
                JobStatus::Error => {
                    let message = job.error.unwrap_or_else(|| "unknown error".to_string());
                    redacted_warn!("Transcription job {} failed: {}", job_id, message);
                    return Err(TranscriptionError::ProviderReportedError(message));
                }
                JobStatus::Queued | JobStatus::Processing | JobStatus::Unknown => {}
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        Err(TranscriptionError::Timeout {
            attempts: max_attempts,
        })
    }
}

#[async_trait]
impl TranscriptionProvider for AssemblyAiClient {
    async fn transcribe(&self, audio: Vec<u8>) -> TranscriptionResult<Transcript> {
        if audio.is_empty() {
            return Err(TranscriptionError::UploadFailed("audio is empty".to_string()));
        }

        let audio_url = self.upload(audio).await?;
        let job_id = self.submit(&audio_url).await?;
        info!(job_id = %job_id, language = %self.config.language_code, "Transcription job submitted");

        let transcript = self.poll(&job_id).await?;
        info!(
            job_id = %transcript.id,
            attempts = transcript.attempts,
            chars = transcript.text.chars().count(),
            "Transcription completed"
        );
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "assemblyai"
    }
}

/// Decode a success body, or return the provider's error text.
async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;

    if !status.is_success() {
        return Err(provider_message(&body).unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), body)));
    }

    serde_json::from_str(&body).map_err(|e| format!("unexpected response: {}", e))
}

/// AssemblyAI error bodies look like `{"error": "..."}`
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_prefers_error_field() {
        assert_eq!(
            provider_message(r#"{"error":"Authentication error, API token missing/invalid"}"#).as_deref(),
            Some("Authentication error, API token missing/invalid")
        );
        assert_eq!(provider_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn urls_tolerate_trailing_slash() {
        let client = AssemblyAiClient::new(
            AssemblyAiConfig::new("key").with_base_url("http://localhost:1234/"),
        )
        .unwrap();
        assert_eq!(client.url("/v2/upload"), "http://localhost:1234/v2/upload");
    }
}
