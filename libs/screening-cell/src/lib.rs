pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod testing;

pub use error::ScreeningError;
pub use models::{ClassifyResponse, Eye, GlaucomaAssessment, RiskLevel};
pub use router::{screening_routes, ScreeningState};
pub use services::classifier::{
    classify_photo, decode_photo, encode_jpeg, load_classifier, preprocess, ClassifiedPhoto,
    FundusClassifier, INPUT_SIZE,
};
