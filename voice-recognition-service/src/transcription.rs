use serde::{Deserialize, Serialize};

/// Completed transcript returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    /// Provider job id
    pub id: String,
    pub text: String,
    pub language_code: String,
    /// Status checks made before the job finished
    pub attempts: u32,
}

/// Provider job state. `queued` and `processing` keep the poll loop going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub upload_url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranscriptRequest<'a> {
    pub audio_url: &'a str,
    pub language_code: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_values_do_not_fail_parsing() {
        let job: TranscriptJob =
            serde_json::from_str(r#"{"id":"t1","status":"throttled"}"#).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
    }

    #[test]
    fn completed_job_carries_text() {
        let job: TranscriptJob = serde_json::from_str(
            r#"{"id":"t1","status":"completed","text":"pasien batuk tiga hari","error":null}"#,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.text.as_deref(), Some("pasien batuk tiga hari"));
    }
}
