use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use patient_cell::{patient_routes, PatientService, PatientState};
use screening_cell::testing::{sample_photo_jpeg, sample_photo_png, FixedClassifier};
use shared_database::InMemoryDocumentStore;
use shared_utils::extractor::AuthContext;
use shared_utils::test_utils::{open_session, TestConfig, TestUser};

const BOUNDARY: &str = "patient-test-boundary";

struct Harness {
    app: Router,
    auth: AuthContext,
    token: String,
}

async fn harness(output: f32) -> Harness {
    let auth = TestConfig::default().auth_context();
    let (_, token) = open_session(&auth, &TestUser::specialist()).await;
    let service = PatientService::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(FixedClassifier::new(output)),
    );
    let state = PatientState {
        service: Arc::new(service),
        sessions: auth.sessions.clone(),
    };

    Harness {
        app: patient_routes(state, auth.clone()),
        auth,
        token,
    }
}

fn multipart_body(parts: &[(&str, Option<&str>, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
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

fn patient_json() -> Vec<u8> {
    json!({
        "name": "Ana Gomez",
        "age": "54",
        "sex": "Femenino",
        "address": "Av. Siempre Viva 742",
        "national_id": "12345678",
        "phone": "555-0100"
    })
    .to_string()
    .into_bytes()
}

fn request(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
}

fn multipart_request(method: &str, uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    request(method, uri, token)
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    request(method, uri, token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_ana(h: &Harness) -> Value {
    let body = multipart_body(&[
        ("patient", None, patient_json()),
        ("right_eye", Some("right.jpg"), sample_photo_jpeg(1)),
        ("left_eye", Some("left.png"), sample_photo_png(2)),
    ]);
    let response = h
        .app
        .clone()
        .oneshot(multipart_request("POST", "/", &h.token, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

#[tokio::test]
async fn test_create_and_fetch_patient() {
    let h = harness(0.8).await;
    let created = create_ana(&h).await;

    assert_eq!(created["photos"]["right_eye"]["status"], "stored");
    assert_eq!(
        created["photos"]["left_eye"]["assessment"]["message"],
        "80.00% probability of NOT having glaucoma in the left eye."
    );
    let id = created["patient"]["id"].as_str().unwrap().to_string();

    let response = h
        .app
        .clone()
        .oneshot(request("GET", &format!("/{}", id), &h.token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let detail = json_body(response).await;
    assert_eq!(detail["name"], "Ana Gomez");
    assert_eq!(detail["age"], 54);
    assert_eq!(detail["sex"], "female");
    assert_eq!(detail["right_eye"]["photo_url"], format!("/patients/{}/photos/right", id));
    assert!(detail["right_eye"].get("photo").is_none());
}

#[tokio::test]
async fn test_list_patients() {
    let h = harness(0.2).await;
    create_ana(&h).await;

    let response = h
        .app
        .clone()
        .oneshot(request("GET", "/", &h.token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["patients"][0]["right_eye"]["risk"], "at_risk");
    assert_eq!(body["patients"][0]["has_report"], false);
}

#[tokio::test]
async fn test_create_reports_missing_field() {
    let h = harness(0.8).await;
    let body = multipart_body(&[("patient", None, json!({"name": "Ana Gomez"}).to_string().into_bytes())]);

    let response = h
        .app
        .clone()
        .oneshot(multipart_request("POST", "/", &h.token, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "age is required");
}

#[tokio::test]
async fn test_empty_file_part_counts_as_absent() {
    let h = harness(0.8).await;
    let body = multipart_body(&[
        ("patient", None, patient_json()),
        ("right_eye", Some("right.jpg"), Vec::new()),
    ]);

    let response = h
        .app
        .clone()
        .oneshot(multipart_request("POST", "/", &h.token, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert!(body["photos"].get("right_eye").is_none());
    assert!(body["patient"]["right_eye"].is_null());
}

#[tokio::test]
async fn test_report_and_photo_endpoints() {
    let h = harness(0.8).await;
    let id = create_ana(&h).await["patient"]["id"].as_str().unwrap().to_string();

    let response = h
        .app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/{}/report", id),
            &h.token,
            json!({"report": "Optic disc cupping, refer"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = json_body(response).await;
    assert_eq!(detail["report"], "Optic disc cupping, refer");
    assert!(detail["left_eye"]["prediction"].is_number());

    let response = h
        .app
        .clone()
        .oneshot(
            request("GET", &format!("/{}/photos/left", id), &h.token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
}

#[tokio::test]
async fn test_upload_photos_isolates_bad_eye() {
    let h = harness(0.8).await;
    let id = create_ana(&h).await["patient"]["id"].as_str().unwrap().to_string();

    let body = multipart_body(&[
        ("right_eye", Some("right.jpg"), b"broken".to_vec()),
        ("left_eye", Some("left.jpg"), sample_photo_jpeg(5)),
    ]);
    let response = h
        .app
        .clone()
        .oneshot(multipart_request("PUT", &format!("/{}/photos", id), &h.token, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["photos"]["right_eye"]["status"], "rejected");
    assert_eq!(body["photos"]["left_eye"]["status"], "stored");
    assert!(body["patient"]["right_eye"].is_object());
}

#[tokio::test]
async fn test_patch_renames_patient() {
    let h = harness(0.8).await;
    let id = create_ana(&h).await["patient"]["id"].as_str().unwrap().to_string();

    let response = h
        .app
        .clone()
        .oneshot(json_request("PATCH", &format!("/{}", id), &h.token, json!({"name": "Ana G. Perez"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let detail = json_body(response).await;
    assert_eq!(detail["id"], id);
    assert_eq!(detail["name"], "Ana G. Perez");
    assert_eq!(detail["phone"], "555-0100");
}

#[tokio::test]
async fn test_unknown_patient_is_404() {
    let h = harness(0.8).await;
    let uri = format!("/{}", uuid::Uuid::new_v4());

    let response = h
        .app
        .clone()
        .oneshot(request("GET", &uri, &h.token).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_clears_selection_and_is_idempotent() {
    let h = harness(0.8).await;
    let id = create_ana(&h).await["patient"]["id"].as_str().unwrap().to_string();
    let patient_id: uuid::Uuid = id.parse().unwrap();

    let (other, _) = open_session(&h.auth, &TestUser::staff()).await;
    h.auth.sessions.select_patient(other.id, patient_id).await.unwrap();

    for _ in 0..2 {
        let response = h
            .app
            .clone()
            .oneshot(request("DELETE", &format!("/{}", id), &h.token).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let other = h.auth.sessions.get(other.id).await.unwrap();
    assert!(other.selected_patient.is_none());
}

#[tokio::test]
async fn test_requires_session() {
    let h = harness(0.8).await;
    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
