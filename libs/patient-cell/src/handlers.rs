use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use screening_cell::Eye;
use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::models::{
    CreatePatientRequest, PatientDetail, PatientSummary, PhotoUploads, SavePatientResponse,
    UpdateDemographicsRequest, UpdateReportRequest,
};
use crate::router::PatientState;

/// Parts of a patient multipart body: an optional `patient` JSON part and
/// per-eye photo parts. A photo part with no bytes counts as not supplied.
async fn read_form(
    multipart: &mut Multipart,
) -> Result<(Option<CreatePatientRequest>, PhotoUploads), AppError> {
    let mut patient = None;
    let mut photos = PhotoUploads::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "patient" {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            let request = serde_json::from_str::<CreatePatientRequest>(&text)
                .map_err(|e| AppError::ValidationError(format!("Invalid patient data: {}", e)))?;
            patient = Some(request);
        } else if let Some(eye) = Eye::from_field_name(&name) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            if bytes.is_empty() {
                debug!("Empty {} upload treated as absent", eye);
            } else {
                photos.set(eye, bytes.to_vec());
            }
        } else {
            debug!("Ignoring multipart field '{}'", name);
        }
    }

    Ok((patient, photos))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<PatientState>,
) -> Result<Json<Value>, AppError> {
    let patients: Vec<PatientSummary> = state
        .service
        .list_patients()
        .await?
        .iter()
        .map(PatientSummary::from)
        .collect();

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<PatientState>,
    Extension(session): Extension<Session>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SavePatientResponse>), AppError> {
    let (patient, photos) = read_form(&mut multipart).await?;
    let request = patient
        .ok_or_else(|| AppError::ValidationError("patient data is required".to_string()))?;

    debug!("{} is registering patient '{}'", session.user.username, request.name);
    let outcome = state.service.create_patient(request, photos).await?;

    Ok((StatusCode::CREATED, Json(SavePatientResponse::from(&outcome))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<PatientState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<PatientDetail>, AppError> {
    let patient = state.service.get_patient(patient_id).await?;
    Ok(Json(PatientDetail::from(&patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<PatientState>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdateDemographicsRequest>,
) -> Result<Json<PatientDetail>, AppError> {
    let patient = state.service.update_demographics(patient_id, request).await?;
    Ok(Json(PatientDetail::from(&patient)))
}

#[axum::debug_handler]
pub async fn update_report(
    State(state): State<PatientState>,
    Extension(session): Extension<Session>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdateReportRequest>,
) -> Result<Json<PatientDetail>, AppError> {
    debug!("{} is updating the report of {}", session.user.username, patient_id);
    let patient = state.service.update_report(patient_id, request.report).await?;
    Ok(Json(PatientDetail::from(&patient)))
}

#[axum::debug_handler]
pub async fn upload_photos(
    State(state): State<PatientState>,
    Path(patient_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SavePatientResponse>, AppError> {
    let (_, photos) = read_form(&mut multipart).await?;
    let outcome = state.service.attach_photos(patient_id, photos).await?;
    Ok(Json(SavePatientResponse::from(&outcome)))
}

#[axum::debug_handler]
pub async fn get_photo(
    State(state): State<PatientState>,
    Path((patient_id, eye)): Path<(Uuid, Eye)>,
) -> Result<impl IntoResponse, AppError> {
    let photo = state.service.photo(patient_id, eye).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], photo))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<PatientState>,
    Extension(session): Extension<Session>,
    Path(patient_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.service.delete_patient(patient_id).await?;
    state.sessions.forget_patient(patient_id).await;

    debug!("{} deleted patient {}", session.user.username, patient_id);
    Ok(StatusCode::NO_CONTENT)
}
