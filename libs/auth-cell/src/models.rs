use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::{Session, User};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: User,
    pub message: String,
    pub selected_patient: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            message: session.welcome_message(),
            selected_patient: session.selected_patient,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectPatientRequest {
    pub patient_id: Uuid,
}
