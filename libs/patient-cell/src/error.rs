use thiserror::Error;
use uuid::Uuid;

use screening_cell::Eye;
use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    NotFound(Uuid),

    #[error("Patient {0} has no {1} eye photo")]
    PhotoNotFound(Uuid, Eye),

    #[error("{0}")]
    Validation(String),

    #[error("Stored patient document is corrupt: {0}")]
    CorruptDocument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(_) | PatientError::PhotoNotFound(..) => {
                AppError::NotFound(err.to_string())
            }
            PatientError::Validation(msg) => AppError::ValidationError(msg),
            PatientError::CorruptDocument(_) => AppError::Database(err.to_string()),
            PatientError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}
