#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use copilot_server::{create_app, AnonymousAccess, CopilotServer, ServerComponents};
use database_layer::{InMemoryDatabase, QueryCache};
use diagnosis_service::{
    ClinicalAssessment, DiagnosisError, DiagnosisProvider, DiagnosisResult, DiagnosisSuggestion,
    PatientContext,
};
use ehr_document::MedicalRecordFormat;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use voice_recognition_service::{
    Transcript, TranscriptionError, TranscriptionProvider, TranscriptionResult,
};

pub const JWT_SECRET: &str = "test-secret-that-is-at-least-32-bytes";
pub const BOUNDARY: &str = "copilot-test-boundary";
pub const TRANSCRIPT: &str = "Pasien mengeluh demam dan nyeri tenggorokan sejak tiga hari";

/// Returns a canned transcript, or fails when `fail` is set
pub struct FakeTranscriber {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TranscriptionProvider for FakeTranscriber {
    async fn transcribe(&self, _audio: Vec<u8>) -> TranscriptionResult<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TranscriptionError::UploadFailed("Invalid API key".to_string()));
        }
        Ok(Transcript {
            id: "tx-1".to_string(),
            text: TRANSCRIPT.to_string(),
            language_code: "id".to_string(),
            attempts: 1,
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub struct FakeDiagnosis;

#[async_trait]
impl DiagnosisProvider for FakeDiagnosis {
    async fn suggest_diagnosis(
        &self,
        _transcript: &str,
        _patient: &PatientContext,
    ) -> Option<DiagnosisSuggestion> {
        Some(DiagnosisSuggestion {
            payload: json!({"primary_diagnosis": "Faringitis akut"}),
            raw_text: String::new(),
            model: "fake-model".to_string(),
        })
    }

    async fn medical_record_format(
        &self,
        _diagnosis: &str,
        _patient: &PatientContext,
        _transcript: Option<&str>,
    ) -> Option<MedicalRecordFormat> {
        serde_json::from_value(json!({
            "diagnosis_category": "respiratory",
            "vital_signs_needed": ["Suhu", "Saturasi oksigen"],
            "warning_signs": ["Sesak napas"]
        }))
        .ok()
    }

    async fn assess(
        &self,
        transcript: &str,
        _patient: &PatientContext,
    ) -> DiagnosisResult<ClinicalAssessment> {
        if transcript.trim().is_empty() {
            return Err(DiagnosisError::EmptyTranscript);
        }
        Ok(ClinicalAssessment {
            primary_diagnosis: "Faringitis akut".to_string(),
            ..Default::default()
        })
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

pub struct TestApp {
    pub app: Router,
    pub server: CopilotServer,
    pub db: Arc<InMemoryDatabase>,
    pub transcriber: Arc<FakeTranscriber>,
}

pub struct TestOptions {
    pub anonymous_user: Option<&'static str>,
    pub failing_transcriber: bool,
    pub with_diagnosis: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            anonymous_user: None,
            failing_transcriber: false,
            with_diagnosis: true,
        }
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        let transcriber = Arc::new(FakeTranscriber {
            fail: options.failing_transcriber,
            calls: AtomicUsize::new(0),
        });

        let anonymous = match options.anonymous_user {
            Some(email) => {
                let user = copilot_server::server::ensure_anonymous_user(db.as_ref(), email)
                    .await
                    .unwrap();
                AnonymousAccess::Allowed {
                    user_id: user.id,
                    email: user.email,
                }
            }
            None => AnonymousAccess::Denied,
        };

        let diagnosis: Option<Arc<dyn DiagnosisProvider>> = if options.with_diagnosis {
            Some(Arc::new(FakeDiagnosis))
        } else {
            None
        };

        let server = CopilotServer::new(ServerComponents {
            users: db.clone(),
            patients: db.clone(),
            consultations: db.clone(),
            database: None,
            transcriber: transcriber.clone(),
            diagnosis,
            cache: Arc::new(QueryCache::default()),
            tokens: copilot_server::auth::TokenService::new(JWT_SECRET, 3600),
            anonymous,
            max_upload_bytes: 1024 * 1024,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        })
        .unwrap();

        Self {
            app: create_app(server.clone()),
            server,
            db,
            transcriber,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Register and log in, returning a bearer token
    pub async fn login_token(&self) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/api/auth/register",
                json!({"email": "sari@klinik.id", "password": "rahasia123", "name": "Dr. Sari"}),
                None,
            ))
            .await;
        assert!(response.status().is_success());

        let response = self
            .send(json_request(
                "POST",
                "/api/auth/login",
                json!({"email": "sari@klinik.id", "password": "rahasia123"}),
                None,
            ))
            .await;
        let body = body_json(response).await;
        body["token"].as_str().unwrap().to_string()
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Multipart upload with an optional audio part and text fields
pub fn upload_request(audio: Option<&[u8]>, fields: &[(&str, &str)], token: Option<&str>) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    if let Some(audio) = audio {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"visit.webm\"\r\nContent-Type: audio/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(audio);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/consultations/transcribe")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
