use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

/// Claims carried by a session token. `sid` ties the token to a live
/// [`Session`]; a token whose session was removed is rejected even if the
/// signature and expiry still check out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub sid: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Front-desk clinic staff.
    Staff,
    Specialist,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Staff => write!(f, "staff"),
            Role::Specialist => write!(f, "specialist"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: Role,
}

/// Per-login workflow state. Replaced wholesale on login and removed on
/// logout; nothing else about a user's interaction is kept server side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user: User,
    pub selected_patient: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: User, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user,
            selected_patient: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn welcome_message(&self) -> String {
        format!("Welcome {}", self.user.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Specialist).unwrap(), "\"specialist\"");
        let role: Role = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(role, Role::Staff);
    }

    #[test]
    fn test_session_expiry() {
        let user = User { username: "personal1".to_string(), role: Role::Staff };
        let session = Session::new(user, chrono::Duration::minutes(5));

        assert!(session.selected_patient.is_none());
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(Utc::now() + chrono::Duration::minutes(6)));
        assert_eq!(session.welcome_message(), "Welcome personal1");
    }
}
