pub mod classifier;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::{classify_photo, decode_photo, encode_jpeg, load_classifier, FundusClassifier};
