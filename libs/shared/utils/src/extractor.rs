use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_config::AppConfig;
use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::jwt::validate_token;
use crate::session::SessionStore;

/// State the auth middleware needs: the signing secret and the live sessions.
#[derive(Clone)]
pub struct AuthContext {
    pub secret: Arc<str>,
    pub sessions: SessionStore,
}

impl AuthContext {
    pub fn new(config: &AppConfig, sessions: SessionStore) -> Self {
        Self {
            secret: Arc::from(config.session_secret.as_str()),
            sessions,
        }
    }

    /// Resolves a bearer token to its live session.
    pub async fn resolve(&self, token: &str) -> Result<Session, AppError> {
        let claims = validate_token(token, &self.secret).map_err(AppError::Auth)?;

        let session = self
            .sessions
            .get(claims.sid)
            .await
            .ok_or_else(|| AppError::Auth("Session has ended".to_string()))?;

        if session.user.username != claims.sub {
            return Err(AppError::Auth("Token does not match session".to_string()));
        }

        Ok(session)
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

pub async fn auth_middleware(
    State(auth): State<AuthContext>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?.to_string();
    let session = auth.resolve(&token).await?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
