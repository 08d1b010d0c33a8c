//! AssemblyAI protocol tests against a local mock server.

use mockito::{Matcher, Server, ServerGuard};
use std::time::Duration;
use voice_recognition_service::{
    AssemblyAiClient, AssemblyAiConfig, TranscriptionError, TranscriptionProvider,
};

const KEY: &str = "test-key";

fn client(server: &ServerGuard, max_attempts: u32) -> AssemblyAiClient {
    let config = AssemblyAiConfig::new(KEY)
        .with_base_url(server.url())
        .with_polling(Duration::ZERO, max_attempts);
    AssemblyAiClient::new(config).unwrap()
}

async fn mock_upload(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/v2/upload")
        .match_header("authorization", KEY)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"upload_url":"https://cdn.example/audio/abc"}"#)
        .expect(1)
        .create_async()
        .await
}

async fn mock_submit(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/v2/transcript")
        .match_header("authorization", KEY)
        .match_body(Matcher::Json(serde_json::json!({
            "audio_url": "https://cdn.example/audio/abc",
            "language_code": "id"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"job-1","status":"queued"}"#)
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn completed_job_returns_text_on_first_completed_poll() {
    let mut server = Server::new_async().await;
    let upload = mock_upload(&mut server).await;
    let submit = mock_submit(&mut server).await;
    let poll = server
        .mock("GET", "/v2/transcript/job-1")
        .with_status(200)
        .with_body(r#"{"id":"job-1","status":"completed","text":"Pasien mengeluh demam sejak dua hari."}"#)
        .expect(1)
        .create_async()
        .await;

    let transcript =
        tokio_test::assert_ok!(client(&server, 120).transcribe(b"RIFF....".to_vec()).await);

    assert_eq!(transcript.text, "Pasien mengeluh demam sejak dua hari.");
    assert_eq!(transcript.id, "job-1");
    assert_eq!(transcript.attempts, 1);
    upload.assert_async().await;
    submit.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn provider_error_status_is_reported_with_its_message() {
    let mut server = Server::new_async().await;
    let _upload = mock_upload(&mut server).await;
    let _submit = mock_submit(&mut server).await;
    let _poll = server
        .mock("GET", "/v2/transcript/job-1")
        .with_status(200)
        .with_body(r#"{"id":"job-1","status":"error","error":"Audio file is too short"}"#)
        .create_async()
        .await;

    let err = client(&server, 120).transcribe(vec![1, 2, 3]).await.unwrap_err();

    assert_eq!(
        err,
        TranscriptionError::ProviderReportedError("Audio file is too short".to_string())
    );
}

#[tokio::test]
async fn times_out_after_max_processing_polls() {
    let mut server = Server::new_async().await;
    let _upload = mock_upload(&mut server).await;
    let _submit = mock_submit(&mut server).await;
    let poll = server
        .mock("GET", "/v2/transcript/job-1")
        .with_status(200)
        .with_body(r#"{"id":"job-1","status":"processing"}"#)
        .expect(120)
        .create_async()
        .await;

    let err = client(&server, 120).transcribe(vec![1, 2, 3]).await.unwrap_err();

    assert_eq!(err, TranscriptionError::Timeout { attempts: 120 });
    poll.assert_async().await;
}

#[tokio::test]
async fn rejected_upload_carries_provider_message() {
    let mut server = Server::new_async().await;
    let _upload = server
        .mock("POST", "/v2/upload")
        .with_status(401)
        .with_body(r#"{"error":"Authentication error, API token missing/invalid"}"#)
        .create_async()
        .await;
    let submit = server
        .mock("POST", "/v2/transcript")
        .expect(0)
        .create_async()
        .await;

    let err = client(&server, 120).transcribe(vec![1]).await.unwrap_err();

    assert_eq!(
        err,
        TranscriptionError::UploadFailed("Authentication error, API token missing/invalid".to_string())
    );
    submit.assert_async().await;
}

#[tokio::test]
async fn rejected_submission_is_a_submission_failure() {
    let mut server = Server::new_async().await;
    let _upload = mock_upload(&mut server).await;
    let _submit = server
        .mock("POST", "/v2/transcript")
        .with_status(400)
        .with_body(r#"{"error":"language_code is not supported"}"#)
        .create_async()
        .await;

    let err = client(&server, 120).transcribe(vec![1]).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::SubmissionFailed(msg) if msg.contains("language_code")));
}

#[tokio::test]
async fn failed_status_check_stops_polling() {
    let mut server = Server::new_async().await;
    let _upload = mock_upload(&mut server).await;
    let _submit = mock_submit(&mut server).await;
    let poll = server
        .mock("GET", "/v2/transcript/job-1")
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;

    let err = client(&server, 120).transcribe(vec![1]).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::StatusCheckFailed(msg) if msg.contains("500")));
    poll.assert_async().await;
}

#[tokio::test]
async fn empty_audio_is_rejected_before_any_request() {
    let server = Server::new_async().await;
    let err = client(&server, 120).transcribe(Vec::new()).await.unwrap_err();
    assert!(matches!(err, TranscriptionError::UploadFailed(_)));
}
