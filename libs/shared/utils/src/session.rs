use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::{Session, User};

/// Live sessions, keyed by session id. Cheap to clone; all clones share the
/// same map.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self, user: User) -> Session {
        let session = Session::new(user, self.ttl);
        info!("Opening session {} for {}", session.id, session.user.username);
        self.sessions.write().await.insert(session.id, session.clone());
        session
    }

    /// Returns the session if it exists and has not expired. Expired sessions
    /// are dropped on access.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                Some(session) if !session.is_expired(now) => return Some(session.clone()),
                None => return None,
                Some(_) => {}
            }
        }
        debug!("Session {} expired", id);
        self.sessions.write().await.remove(&id);
        None
    }

    pub async fn select_patient(&self, id: Uuid, patient_id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        session.selected_patient = Some(patient_id);
        Some(session.clone())
    }

    pub async fn clear_selection(&self, id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id)?;
        session.selected_patient = None;
        Some(session.clone())
    }

    /// Clears the selection of every session pointing at `patient_id`. Used
    /// when a patient is deleted.
    pub async fn forget_patient(&self, patient_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        for session in sessions.values_mut() {
            if session.selected_patient == Some(patient_id) {
                session.selected_patient = None;
            }
        }
    }

    /// Logout. Removes every piece of state held for the session in one step.
    pub async fn remove(&self, id: Uuid) -> Option<Session> {
        let removed = self.sessions.write().await.remove(&id);
        if let Some(session) = &removed {
            info!("Closed session {} for {}", session.id, session.user.username);
        }
        removed
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
