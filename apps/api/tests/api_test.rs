use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_cell::services::hash_password;
use auth_cell::StaticCredentialProvider;
use glaucoma_clinic_api::{create_router, Services};
use screening_cell::testing::{sample_photo_jpeg, sample_photo_png, FixedClassifier};
use shared_config::AppConfig;
use shared_database::InMemoryDocumentStore;
use shared_utils::session::SessionStore;

const BOUNDARY: &str = "api-test-boundary";

fn app(reports_dir: &std::path::Path, max_upload_bytes: usize) -> Router {
    let accounts = json!([
        {"username": "personal1", "role": "staff", "password_hash": hash_password("clave-personal").unwrap()},
        {"username": "especialista1", "role": "specialist", "password_hash": hash_password("clave-especialista").unwrap()},
    ]);
    let config = AppConfig {
        reports_dir: reports_dir.to_path_buf(),
        max_upload_bytes,
        ..AppConfig::default()
    };
    let sessions = SessionStore::new(chrono::Duration::minutes(config.session_ttl_minutes));

    create_router(Services {
        config,
        classifier: Arc::new(FixedClassifier::new(0.8)),
        credentials: Arc::new(StaticCredentialProvider::from_json(&accounts.to_string()).unwrap()),
        store: Arc::new(InMemoryDocumentStore::new()),
        sessions,
    })
    .unwrap()
}

fn multipart_body(parts: &[(&str, Option<&str>, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/jpeg\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(json!({"username": username, "password": password}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_clinic_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), 10 * 1024 * 1024);

    // Staff registers the patient with both photos.
    let staff = login(&app, "personal1", "clave-personal").await;
    let body = multipart_body(&[
        (
            "patient",
            None,
            json!({
                "name": "Ana Gomez",
                "age": 54,
                "sex": "female",
                "address": "Av. Siempre Viva 742",
                "national_id": "12345678",
                "phone": "555-0100",
                "prior_symptoms": "Eye pain"
            })
            .to_string()
            .into_bytes(),
        ),
        ("right_eye", Some("r.jpg"), sample_photo_jpeg(1)),
        ("left_eye", Some("l.png"), sample_photo_png(2)),
    ]);
    let response = send(
        &app,
        authed("POST", "/patients", &staff)
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = json_body(response).await["patient"]["id"].as_str().unwrap().to_string();

    // Specialist selects the patient and writes the report.
    let specialist = login(&app, "especialista1", "clave-especialista").await;
    let response = send(
        &app,
        authed("PUT", "/auth/session/selection", &specialist)
            .header("content-type", "application/json")
            .body(Body::from(json!({"patient_id": id}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        authed("PUT", &format!("/patients/{}/report", id), &specialist)
            .header("content-type", "application/json")
            .body(Body::from(json!({"report": "Normal optic nerve."}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = json_body(response).await;
    assert_eq!(
        detail["right_eye"]["assessment"]["message"],
        "80.00% probability of NOT having glaucoma in the right eye."
    );

    let response = send(
        &app,
        authed("GET", &format!("/reports/{}", id), &specialist)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(dir.path().join("Reporte_Ana Gomez.pdf").exists());

    // Logout ends the session.
    let response = send(&app, authed("POST", "/auth/logout", &specialist).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&app, authed("GET", "/patients", &specialist).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The staff session is unaffected.
    let response = send(&app, authed("GET", "/patients", &staff).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["total"], 1);
}

#[tokio::test]
async fn test_preview_classification_route() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), 10 * 1024 * 1024);
    let token = login(&app, "personal1", "clave-personal").await;

    let body = multipart_body(&[("photo", Some("eye.jpg"), sample_photo_jpeg(4))]);
    let response = send(
        &app,
        authed("POST", "/screening/classify", &token)
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["assessment"]["risk"], "negative");
}

#[tokio::test]
async fn test_upload_limit_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), 1024);
    let token = login(&app, "personal1", "clave-personal").await;

    let body = multipart_body(&[("photo", Some("eye.bin"), vec![0u8; 4096])]);
    let response = send(
        &app,
        authed("POST", "/screening/classify", &token)
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert!(response.status().is_client_error());
    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_root_is_public() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), 1024);

    let response = send(&app, Request::builder().uri("/").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
}
