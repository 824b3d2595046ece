use std::path::PathBuf;

use shared_models::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelInit(String),

    #[error("Classifier backend not available in this build (enable the `onnx` feature)")]
    BackendUnavailable,

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Unreadable image: {0}")]
    InvalidImage(String),

    #[error("Failed to encode image: {0}")]
    Encoding(String),
}

impl From<ScreeningError> for AppError {
    fn from(err: ScreeningError) -> Self {
        match err {
            ScreeningError::UnsupportedFormat(_) | ScreeningError::InvalidImage(_) => {
                AppError::BadRequest(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}
