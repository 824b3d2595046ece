use chrono::Duration;

use shared_config::AppConfig;
use shared_models::auth::{Role, Session, SessionClaims, User};

use crate::extractor::AuthContext;
use crate::jwt::{issue_session_token, issue_token};
use crate::session::SessionStore;

pub const TEST_SESSION_SECRET: &str = "test-secret-key-for-session-tokens-must-be-long-enough";

pub struct TestConfig {
    pub session_secret: String,
    pub session_ttl_minutes: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            session_secret: TEST_SESSION_SECRET.to_string(),
            session_ttl_minutes: 60,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            session_secret: self.session_secret.clone(),
            session_ttl_minutes: self.session_ttl_minutes,
            ..AppConfig::default()
        }
    }

    pub fn auth_context(&self) -> AuthContext {
        let sessions = SessionStore::new(Duration::minutes(self.session_ttl_minutes));
        AuthContext::new(&self.to_app_config(), sessions)
    }
}

pub struct TestUser {
    pub username: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(username: &str, role: Role) -> Self {
        Self {
            username: username.to_string(),
            role,
        }
    }

    pub fn staff() -> Self {
        Self::new("personal1", Role::Staff)
    }

    pub fn specialist() -> Self {
        Self::new("especialista1", Role::Specialist)
    }

    pub fn to_user(&self) -> User {
        User {
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Opens a session for `user` directly in the store, bypassing credential
/// checks, and returns it with a valid bearer token.
pub async fn open_session(auth: &AuthContext, user: &TestUser) -> (Session, String) {
    let session = auth.sessions.create(user.to_user()).await;
    let token = issue_session_token(&session, &auth.secret)
        .expect("test token should sign");
    (session, token)
}

pub struct TokenTestUtils;

impl TokenTestUtils {
    pub fn expired_token(session: &Session, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: session.user.username.clone(),
            sid: session.id,
            role: session.user.role,
            iat: now - 7200,
            exp: now - 3600,
        };
        issue_token(&claims, secret).expect("test token should sign")
    }

    pub fn wrong_secret_token(session: &Session) -> String {
        issue_session_token(session, "wrong-secret").expect("test token should sign")
    }

    pub fn malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}
