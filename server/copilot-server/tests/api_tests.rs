mod common;

use axum::http::{header, StatusCode};
use common::*;
use database_layer::{ConsultationRepository, ConsultationStatus};
use serde_json::json;
use std::sync::atomic::Ordering;

// =============================================================================
// HEALTH AND AUTH
// =============================================================================

#[tokio::test]
async fn health_reports_ok_without_database() {
    let app = TestApp::new().await;

    let response = app.send(empty_request("GET", "/api/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    assert!(body["time"].is_string());
}

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/register",
            json!({"email": "Sari@Klinik.id", "password": "rahasia123", "name": "Dr. Sari"}),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Registered");
    assert_eq!(body["user"]["email"], "sari@klinik.id");
    assert!(body["user"].get("password_hash").is_none());

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            json!({"email": "sari@klinik.id", "password": "rahasia123"}),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["name"], "Dr. Sari");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new().await;
    app.login_token().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/register",
            json!({"email": "sari@klinik.id", "password": "lain12345", "name": "Dr. Lain"}),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Email already exists");
}

#[tokio::test]
async fn invalid_registration_names_the_field() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/register",
            json!({"email": "not-an-email", "password": "rahasia123", "name": "Dr. Sari"}),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid email format");
    assert_eq!(body["error_type"], "validation_error");
    assert!(body["error_id"].is_string());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.login_token().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            json!({"email": "sari@klinik.id", "password": "salah-sekali"}),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid credentials");
}

// =============================================================================
// PATIENTS
// =============================================================================

#[tokio::test]
async fn patient_registration_requires_name() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request("POST", "/api/patients", json!({"jkn_number": "123"}), None))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Name is required");
}

#[tokio::test]
async fn patient_registration_reuses_jkn_and_search_sees_it() {
    let app = TestApp::new().await;
    let patient = json!({"jkn_number": "0001234567890", "name": "Budi Santoso", "dob": "1985-02-11"});

    // Prime the search cache so registration has to invalidate it
    let response = app.send(empty_request("GET", "/api/patients?name=budi", None)).await;
    assert_eq!(body_json(response).await, json!([]));

    let first = body_json(app.send(json_request("POST", "/api/patients", patient.clone(), None)).await).await;
    let second = body_json(app.send(json_request("POST", "/api/patients", patient, None)).await).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(app.db.patient_count(), 1);

    let response = app
        .send(empty_request("GET", "/api/patients?name=BUDI&dob=1985-02-11", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let found = body_json(response).await;
    assert_eq!(found.as_array().map(Vec::len), Some(1));
    assert_eq!(found[0]["id"], first["id"]);
}

#[tokio::test]
async fn patient_search_rejects_bad_dates() {
    let app = TestApp::new().await;

    let response = app
        .send(empty_request("GET", "/api/patients?dob=11-02-1985", None))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// TRANSCRIBE
// =============================================================================

#[tokio::test]
async fn same_jkn_twice_creates_one_patient_and_two_consultations() {
    let app = TestApp::new().await;
    let token = app.login_token().await;
    let patient = r#"{"name":"Budi","jkn_number":"123"}"#;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let response = app
            .send(upload_request(
                Some(b"RIFF-audio"),
                &[("patient", patient), ("diagnosis", "Faringitis"), ("therapy", r#"["Paracetamol 500mg"]"#)],
                Some(&token),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["persisted"], true);
        assert_eq!(body["transcription"], TRANSCRIPT);
        ids.push(body["consultationId"].as_i64().unwrap() as i32);
    }

    assert_eq!(app.db.patient_count(), 1);
    assert_eq!(app.db.consultation_count(), 2);
    assert_ne!(ids[0], ids[1]);

    let first = ConsultationRepository::find_by_id(app.db.as_ref(), ids[0])
        .await
        .unwrap()
        .unwrap();
    let second = ConsultationRepository::find_by_id(app.db.as_ref(), ids[1])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.patient_id, second.patient_id);
    assert_eq!(first.status, ConsultationStatus::Transcribed);
    assert_eq!(first.ai_model.as_deref(), Some("fake-model"));
}

#[tokio::test]
async fn notes_are_served_as_html() {
    let app = TestApp::new().await;
    let token = app.login_token().await;

    let response = app
        .send(upload_request(
            Some(b"RIFF-audio"),
            &[
                ("patient", r#"{"name":"Budi <script>","jkn_number":"123"}"#),
                ("vitals", r#"{"temperature":"38.5","bp":"120/80"}"#),
            ],
            Some(&token),
        ))
        .await;
    let id = body_json(response).await["consultationId"].as_i64().unwrap();

    let response = app
        .send(empty_request("GET", &format!("/api/consultations/{}/notes", id), Some(&token)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let html = body_text(response).await;
    assert!(html.contains("Budi &lt;script&gt;"));
    assert!(html.contains("38.5"));
    assert!(html.contains("Belum diisi"));
}

#[tokio::test]
async fn missing_notes_are_plain_not_found() {
    let app = TestApp::new().await;
    let token = app.login_token().await;

    let response = app
        .send(empty_request("GET", "/api/consultations/999/notes", Some(&token)))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Not found");
}

#[tokio::test]
async fn upload_without_audio_is_rejected() {
    let app = TestApp::new().await;
    let token = app.login_token().await;

    let response = app
        .send(upload_request(None, &[("patient", r#"{"name":"Budi"}"#)], Some(&token)))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No audio file provided");
    assert_eq!(app.transcriber.calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.db.patient_count(), 0);
}

#[tokio::test]
async fn transcription_failure_is_bad_gateway() {
    let app = TestApp::with_options(TestOptions {
        failing_transcriber: true,
        ..Default::default()
    })
    .await;
    let token = app.login_token().await;

    let response = app
        .send(upload_request(Some(b"RIFF-audio"), &[], Some(&token)))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Upload failed: Invalid API key");
    assert_eq!(app.db.consultation_count(), 0);
}

#[tokio::test]
async fn upload_without_patient_creates_placeholder() {
    let app = TestApp::new().await;
    let token = app.login_token().await;

    let response = app
        .send(upload_request(Some(b"RIFF-audio"), &[], Some(&token)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.db.patient_count(), 1);

    let response = app
        .send(empty_request("GET", "/api/patients?name=Pasien%20Tidak", None))
        .await;
    let found = body_json(response).await;
    assert_eq!(found[0]["name"], "Pasien Tidak Diketahui");
}

// =============================================================================
// ANONYMOUS ACCESS
// =============================================================================

#[tokio::test]
async fn consultations_require_token_by_default() {
    let app = TestApp::new().await;

    let response = app
        .send(upload_request(Some(b"RIFF-audio"), &[], None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(empty_request("GET", "/api/consultations", Some("not-a-token")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.transcriber.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn anonymous_requests_act_as_demo_user_when_enabled() {
    let app = TestApp::with_options(TestOptions {
        anonymous_user: Some("demo@clinical-copilot.local"),
        ..Default::default()
    })
    .await;
    let copilot_server::AnonymousAccess::Allowed { user_id, .. } = app.server.anonymous.clone() else {
        panic!("anonymous access should be enabled");
    };

    let response = app
        .send(upload_request(Some(b"RIFF-audio"), &[], None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["consultationId"].as_i64().unwrap() as i32;

    let stored = ConsultationRepository::find_by_id(app.db.as_ref(), id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.doctor_id, user_id);

    // The demo account cannot be logged into
    let response = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            json!({"email": "demo@clinical-copilot.local", "password": "!disabled"}),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// LISTING, AI AND STATUS
// =============================================================================

#[tokio::test]
async fn listing_reflects_new_uploads() {
    let app = TestApp::new().await;
    let token = app.login_token().await;
    let upload = || upload_request(Some(b"RIFF-audio"), &[("patient", r#"{"name":"Budi","jkn_number":"123"}"#)], Some(&token));

    app.send(upload()).await;
    let listed = body_json(app.send(empty_request("GET", "/api/consultations", Some(&token))).await).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["patient_name"], "Budi");
    assert_eq!(listed[0]["doctor_name"], "Dr. Sari");

    app.send(upload()).await;
    let listed = body_json(app.send(empty_request("GET", "/api/consultations", Some(&token))).await).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn status_moves_forward_only() {
    let app = TestApp::new().await;
    let token = app.login_token().await;
    let response = app.send(upload_request(Some(b"RIFF-audio"), &[], Some(&token))).await;
    let id = body_json(response).await["consultationId"].as_i64().unwrap();
    let uri = format!("/api/consultations/{}/status", id);

    let response = app
        .send(json_request("PATCH", &uri, json!({"status": "COMPLETED"}), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"id": id, "status": "COMPLETED"}));

    let response = app
        .send(json_request("PATCH", &uri, json!({"status": "PENDING"}), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request("PATCH", &uri, json!({"status": "ARCHIVED"}), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saved_ai_payload_is_stored() {
    let app = TestApp::new().await;
    let token = app.login_token().await;
    let response = app.send(upload_request(Some(b"RIFF-audio"), &[], Some(&token))).await;
    let id = body_json(response).await["consultationId"].as_i64().unwrap() as i32;

    let payload = json!({"primary_diagnosis": "ISPA", "reviewed": true});
    let response = app
        .send(json_request(
            "POST",
            &format!("/api/consultations/{}/ai", id),
            json!({"ai_diagnosis": payload, "ai_model": "gemini-2.0-flash"}),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"id": id}));

    let stored = ConsultationRepository::find_by_id(app.db.as_ref(), id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.ai_diagnosis, Some(payload));
    assert_eq!(stored.ai_model.as_deref(), Some("gemini-2.0-flash"));

    let response = app
        .send(json_request("POST", "/api/consultations/999/ai", json!({"ai_diagnosis": {}}), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assessment_and_dynamic_notes() {
    let app = TestApp::new().await;
    let token = app.login_token().await;
    let response = app
        .send(upload_request(
            Some(b"RIFF-audio"),
            &[("patient", r#"{"name":"Budi"}"#), ("diagnosis", "Faringitis akut")],
            Some(&token),
        ))
        .await;
    let id = body_json(response).await["consultationId"].as_i64().unwrap();

    let response = app
        .send(empty_request("POST", &format!("/api/consultations/{}/assessment", id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["primary_diagnosis"], "Faringitis akut");

    let response = app
        .send(empty_request("POST", &format!("/api/consultations/{}/notes/dynamic", id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Sesak napas"));
    assert!(html.contains("Saturasi oksigen"));
    assert!(html.contains("Dr. Sari"));
}

#[tokio::test]
async fn assessment_unavailable_without_provider() {
    let app = TestApp::with_options(TestOptions {
        with_diagnosis: false,
        ..Default::default()
    })
    .await;
    let token = app.login_token().await;
    let response = app.send(upload_request(Some(b"RIFF-audio"), &[], Some(&token))).await;
    let id = body_json(response).await["consultationId"].as_i64().unwrap();

    let response = app
        .send(empty_request("POST", &format!("/api/consultations/{}/assessment", id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // The dynamic note still renders, without format-driven sections
    let response = app
        .send(empty_request("POST", &format!("/api/consultations/{}/notes/dynamic", id), Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
