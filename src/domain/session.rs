//! Visitor authentication state machine
//!
//! ```text
//!   Anonymous --login ok--> Authenticated(username)
//!   Anonymous --login failed--> Anonymous
//!   Authenticated --logout--> Anonymous
//! ```
//!
//! Signup never changes the state; the visitor still has to log in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::UserRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated { username: String, email: String },
}

/// One visitor's session, passed explicitly through the request path.
#[derive(Debug, Clone)]
pub struct AuthSession {
    id: String,
    state: SessionState,
    last_seen: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Anonymous,
            last_seen: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn active_username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { username, .. } => Some(username),
            SessionState::Anonymous => None,
        }
    }

    /// Transition to `Authenticated`. Logging in again replaces the identity.
    pub fn login(&mut self, user: &UserRecord) {
        self.state = SessionState::Authenticated {
            username: user.username.clone(),
            email: user.email.clone(),
        };
        self.touch();
    }

    /// Transition back to `Anonymous`; a no-op when already anonymous.
    pub fn logout(&mut self) {
        self.state = SessionState::Anonymous;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_seen < cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> UserRecord {
        UserRecord {
            username: name.into(),
            email: email.into(),
            password_hash: "hash".into(),
            created_at: None,
        }
    }

    #[test]
    fn starts_anonymous() {
        let s = AuthSession::new("s1");
        assert_eq!(s.state(), &SessionState::Anonymous);
        assert!(!s.is_authenticated());
        assert_eq!(s.active_username(), None);
    }

    #[test]
    fn login_then_logout() {
        let mut s = AuthSession::new("s1");
        s.login(&user("A", "a@x.com"));
        assert!(s.is_authenticated());
        assert_eq!(s.active_username(), Some("A"));

        s.logout();
        assert_eq!(s.state(), &SessionState::Anonymous);
    }

    #[test]
    fn relogin_replaces_identity() {
        let mut s = AuthSession::new("s1");
        s.login(&user("A", "a@x.com"));
        s.login(&user("B", "b@x.com"));
        assert_eq!(s.active_username(), Some("B"));
    }

    #[test]
    fn logout_when_anonymous_is_noop() {
        let mut s = AuthSession::new("s1");
        s.logout();
        assert_eq!(s.state(), &SessionState::Anonymous);
    }

    #[test]
    fn idle_check_uses_last_seen() {
        let s = AuthSession::new("s1");
        assert!(s.is_idle_since(Utc::now() + chrono::Duration::seconds(1)));
        assert!(!s.is_idle_since(Utc::now() - chrono::Duration::minutes(5)));
    }
}
