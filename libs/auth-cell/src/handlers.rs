use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use tracing::{debug, info};

use shared_models::auth::Session;
use shared_models::error::AppError;
use shared_utils::jwt::issue_session_token;

use crate::error::AuthError;
use crate::models::{LoginRequest, LoginResponse, SelectPatientRequest, SessionResponse};
use crate::router::AuthState;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .credentials
        .authenticate(request.username.trim(), &request.password)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let session = state.auth.sessions.create(user).await;
    let token = issue_session_token(&session, &state.auth.secret).map_err(AppError::Internal)?;

    info!("{} logged in as {}", session.user.username, session.user.role);
    Ok(Json(LoginResponse {
        token,
        expires_at: session.expires_at,
        message: session.welcome_message(),
        user: session.user,
    }))
}

/// Ends the session named by the bearer token. A token whose session is
/// already gone still gets a 204.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AuthState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<StatusCode, AppError> {
    let session = match state.auth.resolve(bearer.token()).await {
        Ok(session) => session,
        Err(AppError::Auth(reason)) => {
            debug!("Logout with stale token: {}", reason);
            return Ok(StatusCode::NO_CONTENT);
        }
        Err(e) => return Err(e),
    };

    state.auth.sessions.remove(session.id).await;
    info!("{} logged out", session.user.username);
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn current_session(Extension(session): Extension<Session>) -> Json<SessionResponse> {
    Json(SessionResponse::from(&session))
}

#[axum::debug_handler]
pub async fn select_patient(
    State(state): State<AuthState>,
    Extension(session): Extension<Session>,
    Json(request): Json<SelectPatientRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    state.patients.get_patient(request.patient_id).await?;

    let session = state
        .auth
        .sessions
        .select_patient(session.id, request.patient_id)
        .await
        .ok_or_else(|| AppError::Auth("Session has ended".to_string()))?;

    debug!("{} selected patient {}", session.user.username, request.patient_id);
    Ok(Json(SessionResponse::from(&session)))
}

#[axum::debug_handler]
pub async fn clear_selection(
    State(state): State<AuthState>,
    Extension(session): Extension<Session>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .auth
        .sessions
        .clear_selection(session.id)
        .await
        .ok_or_else(|| AppError::Auth("Session has ended".to_string()))?;
    Ok(Json(SessionResponse::from(&session)))
}
