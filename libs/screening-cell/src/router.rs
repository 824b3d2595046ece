use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_utils::extractor::{auth_middleware, AuthContext};

use crate::handlers;
use crate::services::classifier::FundusClassifier;

#[derive(Clone)]
pub struct ScreeningState {
    pub classifier: Arc<dyn FundusClassifier>,
}

pub fn screening_routes(classifier: Arc<dyn FundusClassifier>, auth: AuthContext) -> Router {
    Router::new()
        .route("/classify", post(handlers::classify_preview))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(ScreeningState { classifier })
}
