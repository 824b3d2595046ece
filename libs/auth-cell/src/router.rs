use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use patient_cell::PatientService;
use shared_utils::extractor::{auth_middleware, AuthContext};

use crate::handlers;
use crate::services::CredentialProvider;

#[derive(Clone)]
pub struct AuthState {
    pub credentials: Arc<dyn CredentialProvider>,
    pub auth: AuthContext,
    pub patients: Arc<PatientService>,
}

pub fn auth_routes(state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout));

    let protected_routes = Router::new()
        .route("/session", get(handlers::current_session))
        .route(
            "/session/selection",
            put(handlers::select_patient).delete(handlers::clear_selection),
        )
        .layer(middleware::from_fn_with_state(state.auth.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
