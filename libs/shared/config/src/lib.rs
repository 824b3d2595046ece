use std::env;
use std::path::PathBuf;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MODEL_PATH: &str = "glaucoma_model.onnx";
const DEFAULT_REPORTS_DIR: &str = "reports";
const DEFAULT_SESSION_TTL_MINUTES: i64 = 480;
const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Where patient documents live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

/// Where the clinic account list comes from. Resolved and validated by the
/// auth cell at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Inline(String),
    File(PathBuf),
    Missing,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub model_path: PathBuf,
    pub reports_dir: PathBuf,
    pub credentials: CredentialSource,
    pub session_secret: String,
    pub session_ttl_minutes: i64,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            store_backend: StoreBackend::Memory,
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            credentials: CredentialSource::Missing,
            session_secret: generate_secret(),
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("supabase") => StoreBackend::Supabase,
            Ok("memory") => StoreBackend::Memory,
            Ok(other) => {
                warn!("Unknown STORE_BACKEND '{}', using in-memory store", other);
                StoreBackend::Memory
            }
            Err(_) => {
                warn!("STORE_BACKEND not set, using in-memory store");
                StoreBackend::Memory
            }
        };

        let credentials = match (env::var("CLINIC_USERS"), env::var("CLINIC_USERS_FILE")) {
            (Ok(inline), _) => CredentialSource::Inline(inline),
            (Err(_), Ok(path)) => CredentialSource::File(PathBuf::from(path)),
            _ => {
                warn!("Neither CLINIC_USERS nor CLINIC_USERS_FILE is set");
                CredentialSource::Missing
            }
        };

        let config = Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| {
                warn!("BIND_ADDR not set, using {}", DEFAULT_BIND_ADDR);
                defaults.bind_addr.clone()
            }),
            store_backend,
            supabase_url: env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY").unwrap_or_default(),
            model_path: env::var("MODEL_PATH").map(PathBuf::from).unwrap_or_else(|_| {
                warn!("MODEL_PATH not set, using {}", DEFAULT_MODEL_PATH);
                defaults.model_path.clone()
            }),
            reports_dir: env::var("REPORTS_DIR").map(PathBuf::from).unwrap_or_else(|_| {
                warn!("REPORTS_DIR not set, using {}", DEFAULT_REPORTS_DIR);
                defaults.reports_dir.clone()
            }),
            credentials,
            session_secret: env::var("SESSION_SECRET").unwrap_or_else(|_| {
                warn!("SESSION_SECRET not set, sessions will not survive a restart");
                defaults.session_secret.clone()
            }),
            session_ttl_minutes: parse_or("SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES),
            max_upload_bytes: parse_or("MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB) * 1024 * 1024,
        };

        if config.store_backend == StoreBackend::Supabase && !config.is_supabase_configured() {
            warn!("Supabase store selected but SUPABASE_URL or SUPABASE_SERVICE_KEY is missing");
        }

        config
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.session_ttl_minutes, 480);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.credentials, CredentialSource::Missing);
        assert!(!config.is_supabase_configured());
    }

    #[test]
    fn test_generated_secrets_differ() {
        let a = AppConfig::default();
        let b = AppConfig::default();
        assert!(a.session_secret.len() >= 32);
        assert_ne!(a.session_secret, b.session_secret);
    }
}
