use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Extension,
};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::error::ReportError;
use crate::router::ReportState;

/// Generates the patient's PDF report, stores it in the reports directory
/// and returns it as a download.
#[axum::debug_handler]
pub async fn download_report(
    State(state): State<ReportState>,
    Extension(session): Extension<Session>,
    Path(patient_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let patient = state
        .patients
        .get_patient(patient_id)
        .await
        .map_err(ReportError::from)?;
    debug!("{} requested the report of {}", session.user.username, patient_id);

    let generator = state.generator.clone();
    let report = tokio::task::spawn_blocking(move || generator.generate(&patient))
        .await
        .map_err(|e| AppError::Internal(format!("Report task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&report.file_name)),
        ],
        report.pdf,
    ))
}

/// `attachment` disposition with an ASCII fallback name and the exact UTF-8
/// name in `filename*`.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();

    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", file_name);
    }

    let encoded: String = file_name
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_name_disposition() {
        assert_eq!(
            content_disposition("Reporte_Ana Gomez.pdf"),
            "attachment; filename=\"Reporte_Ana Gomez.pdf\""
        );
    }

    #[test]
    fn test_non_ascii_name_disposition() {
        assert_eq!(
            content_disposition("Reporte_Núñez.pdf"),
            "attachment; filename=\"Reporte_N__ez.pdf\"; filename*=UTF-8''Reporte_N%C3%BA%C3%B1ez.pdf"
        );
    }
}
