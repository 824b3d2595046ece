use thiserror::Error;

use patient_cell::PatientError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Patient(e) => e.into(),
            ReportError::Render(_) | ReportError::Io(_) => AppError::Internal(err.to_string()),
        }
    }
}
