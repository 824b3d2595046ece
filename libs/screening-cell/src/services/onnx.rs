use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use tracing::info;

use crate::error::ScreeningError;
use crate::services::classifier::{single_output, FundusClassifier};

/// Glaucoma model served through ONNX Runtime.
///
/// `Session::run` needs `&mut self`, hence the mutex; requests are classified
/// one at a time.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn load(model_path: &Path) -> Result<Self, ScreeningError> {
        if !model_path.exists() {
            return Err(ScreeningError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ScreeningError::ModelInit(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| ScreeningError::ModelInit(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| ScreeningError::ModelInit(format!("ONNX load failed: {e}")))?;

        info!("ONNX glaucoma model loaded from {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl FundusClassifier for OnnxClassifier {
    fn infer(&self, input: &Array4<f32>) -> Result<f32, ScreeningError> {
        let tensor = TensorRef::from_array_view(input)
            .map_err(|e| ScreeningError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ScreeningError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ScreeningError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ScreeningError::Inference(format!("Output extraction: {e}")))?;

        single_output(&shape[..], data)
    }
}
