use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::debug;

use shared_models::error::AppError;

use crate::models::{ClassifyResponse, Eye, GlaucomaAssessment};
use crate::router::ScreeningState;
use crate::services::classifier::classify_photo;

/// Classifies an uploaded photo without storing anything, so the clinician
/// sees the result before saving the patient.
///
/// Multipart fields: `photo` (the image) and an optional `eye`
/// (`right`/`left`, default `right`). A field named `right_eye` or `left_eye`
/// is accepted in place of `photo` and also sets the eye. Only one photo
/// part is allowed.
#[axum::debug_handler]
pub async fn classify_preview(
    State(state): State<ScreeningState>,
    mut multipart: Multipart,
) -> Result<Json<ClassifyResponse>, AppError> {
    let mut eye = None;
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "eye" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                eye = Some(match value.trim() {
                    "right" => Eye::Right,
                    "left" => Eye::Left,
                    other => {
                        return Err(AppError::ValidationError(format!("Unknown eye '{}'", other)))
                    }
                });
            }
            "photo" | "right_eye" | "left_eye" => {
                if photo.is_some() {
                    return Err(AppError::ValidationError(
                        "send exactly one photo per preview".to_string(),
                    ));
                }
                if let Some(named) = Eye::from_field_name(&name) {
                    eye.get_or_insert(named);
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                photo = Some(bytes.to_vec());
            }
            _ => debug!("Ignoring multipart field '{}'", name),
        }
    }

    let photo = photo.ok_or_else(|| AppError::ValidationError("photo is required".to_string()))?;
    let eye = eye.unwrap_or(Eye::Right);

    let classified = classify_photo(state.classifier.clone(), photo).await?;
    let assessment = GlaucomaAssessment::from_prediction(eye, classified.prediction);
    debug!("Preview classification for {} eye: {}", eye, classified.prediction);

    Ok(Json(ClassifyResponse {
        eye,
        prediction: classified.prediction,
        assessment,
    }))
}
