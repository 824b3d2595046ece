use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use patient_cell::PatientService;
use shared_utils::extractor::{auth_middleware, AuthContext};

use crate::handlers::download_report;
use crate::services::ReportGenerator;

#[derive(Clone)]
pub struct ReportState {
    pub patients: Arc<PatientService>,
    pub generator: ReportGenerator,
}

pub fn report_routes(state: ReportState, auth: AuthContext) -> Router {
    Router::new()
        .route("/{patient_id}", get(download_report))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state)
}
