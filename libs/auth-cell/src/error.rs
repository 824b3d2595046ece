use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid credential configuration: {0}")]
    Config(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::Hash(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::Config(_) | AuthError::Hash(_) => AppError::Internal(err.to_string()),
        }
    }
}
