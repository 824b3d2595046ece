use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_utils::extractor::{auth_middleware, AuthContext};
use shared_utils::session::SessionStore;

use crate::handlers::*;
use crate::services::PatientService;

#[derive(Clone)]
pub struct PatientState {
    pub service: Arc<PatientService>,
    pub sessions: SessionStore,
}

pub fn patient_routes(state: PatientState, auth: AuthContext) -> Router {
    Router::new()
        .route("/", get(list_patients).post(create_patient))
        .route(
            "/{id}",
            get(get_patient).patch(update_patient).delete(delete_patient),
        )
        .route("/{id}/report", put(update_report))
        .route("/{id}/photos", put(upload_photos))
        .route("/{id}/photos/{eye}", get(get_photo))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state)
}
