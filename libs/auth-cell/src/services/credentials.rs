use std::collections::HashMap;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use shared_config::CredentialSource;
use shared_models::auth::{Role, User};

use crate::error::AuthError;

#[instrument(skip(password))]
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

#[instrument(skip(password, hash))]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Checks a username/password pair. `Ok(None)` means the pair was rejected;
/// callers must not reveal which half was wrong.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, AuthError>;
}

#[derive(Debug, Deserialize)]
struct AccountEntry {
    username: String,
    role: Role,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct Account {
    role: Role,
    password_hash: String,
}

/// Fixed account list loaded once at startup.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    accounts: HashMap<String, Account>,
}

impl StaticCredentialProvider {
    /// Parses `[{"username", "role", "password_hash"}]`. Any malformed entry
    /// rejects the whole list.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let entries: Vec<AccountEntry> = serde_json::from_str(json)
            .map_err(|e| AuthError::Config(format!("account list is not valid JSON: {}", e)))?;

        if entries.is_empty() {
            return Err(AuthError::Config("account list is empty".to_string()));
        }

        let mut accounts = HashMap::with_capacity(entries.len());
        for entry in entries {
            let username = entry.username.trim().to_string();
            if username.is_empty() {
                return Err(AuthError::Config("account with empty username".to_string()));
            }
            PasswordHash::new(&entry.password_hash).map_err(|e| {
                AuthError::Config(format!("password hash for '{}' is invalid: {}", username, e))
            })?;

            let account = Account {
                role: entry.role,
                password_hash: entry.password_hash,
            };
            if accounts.insert(username.clone(), account).is_some() {
                return Err(AuthError::Config(format!("duplicate username '{}'", username)));
            }
        }

        info!("Loaded {} clinic accounts", accounts.len());
        Ok(Self { accounts })
    }

    pub fn from_source(source: &CredentialSource) -> Result<Self, AuthError> {
        match source {
            CredentialSource::Inline(json) => Self::from_json(json),
            CredentialSource::File(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    AuthError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_json(&json)
            }
            CredentialSource::Missing => Err(AuthError::Config(
                "set CLINIC_USERS or CLINIC_USERS_FILE".to_string(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, AuthError> {
        let Some(account) = self.accounts.get(username).cloned() else {
            debug!("Login attempt for unknown user");
            return Ok(None);
        };

        let password = password.to_string();
        let hash = account.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))??;

        if !matches {
            warn!("Wrong password for {}", username);
            return Ok(None);
        }

        Ok(Some(User {
            username: username.to_string(),
            role: account.role,
        }))
    }
}
