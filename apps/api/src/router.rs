use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use auth_cell::{auth_routes, AuthState, CredentialProvider};
use patient_cell::{patient_routes, PatientService, PatientState};
use report_cell::{report_routes, ReportError, ReportGenerator, ReportState};
use screening_cell::{screening_routes, FundusClassifier};
use shared_config::AppConfig;
use shared_database::DocumentStore;
use shared_utils::extractor::AuthContext;
use shared_utils::session::SessionStore;

/// Everything the cells need, resolved at startup.
pub struct Services {
    pub config: AppConfig,
    pub classifier: Arc<dyn FundusClassifier>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub sessions: SessionStore,
}

pub fn create_router(services: Services) -> Result<Router, ReportError> {
    let Services {
        config,
        classifier,
        credentials,
        store,
        sessions,
    } = services;

    let auth = AuthContext::new(&config, sessions.clone());
    let patients = Arc::new(PatientService::new(store, classifier.clone()));

    let auth_state = AuthState {
        credentials,
        auth: auth.clone(),
        patients: patients.clone(),
    };
    let patient_state = PatientState {
        service: patients.clone(),
        sessions,
    };
    let report_state = ReportState {
        patients,
        generator: ReportGenerator::new(&config.reports_dir)?,
    };

    Ok(Router::new()
        .route("/", get(|| async { "Glaucoma Clinic API is running!" }))
        .nest("/auth", auth_routes(auth_state))
        .nest("/screening", screening_routes(classifier, auth.clone()))
        .nest("/patients", patient_routes(patient_state, auth.clone()))
        .nest("/reports", report_routes(report_state, auth))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes)))
}
