//! Session registry: visitor sessions keyed by the id in their cookie

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::domain::AuthSession;
use crate::shared::ShutdownSignal;

/// Thread-safe registry of visitor sessions. Never persisted.
pub struct SessionRegistry {
    sessions: DashMap<String, AuthSession>,
    ttl: chrono::Duration,
}

/// Shared, reference-counted session registry
pub type SharedSessionRegistry = Arc<SessionRegistry>;

impl SessionRegistry {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl: chrono::Duration::minutes(ttl_minutes),
        }
    }

    /// Wrap in `Arc` for shared ownership
    pub fn shared(ttl_minutes: i64) -> SharedSessionRegistry {
        Arc::new(Self::new(ttl_minutes))
    }

    /// Look up a live session, or start a fresh anonymous one.
    ///
    /// Unknown or expired ids get a brand-new id so that a stale cookie
    /// cannot be revived.
    pub fn resolve(&self, id: Option<&str>) -> AuthSession {
        let cutoff = Utc::now() - self.ttl;
        if let Some(id) = id {
            if let Some(mut entry) = self.sessions.get_mut(id) {
                if !entry.is_idle_since(cutoff) {
                    entry.touch();
                    return entry.clone();
                }
            }
            self.sessions.remove(id);
        }
        let session = AuthSession::new(uuid::Uuid::new_v4().to_string());
        debug!(session_id = session.id(), "New visitor session");
        session
    }

    /// Store the session after a state transition.
    pub fn save(&self, session: &AuthSession) {
        self.sessions.insert(session.id().to_string(), session.clone());
    }

    pub fn get(&self, id: &str) -> Option<AuthSession> {
        self.sessions.get(id).map(|s| s.clone())
    }

    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn authenticated_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_authenticated()).count()
    }

    /// Drop sessions idle longer than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_idle_since(cutoff));
        before - self.sessions.len()
    }

    /// Periodically sweep expired sessions until shutdown.
    pub fn start_sweeper(self: &Arc<Self>, every: Duration, shutdown: ShutdownSignal) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            info!("Session sweeper started (interval: {}s)", every.as_secs());
            let mut interval = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = registry.sweep_expired();
                        if removed > 0 {
                            debug!(removed, "Expired sessions swept");
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("Session sweeper shutting down");
                        break;
                    }
                }
            }
        });
    }
}
