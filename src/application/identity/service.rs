//! Identity service: signup, login, logout
//!
//! HTTP handlers stay thin and delegate here. The service owns password
//! hashing; new rows only ever carry hashes. Legacy rows holding the
//! plaintext password still authenticate by exact comparison.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{AuthSession, DomainError, DomainResult, NewUser, UserRecord, UserStore};
use crate::infrastructure::crypto::password::{
    hash_password, is_bcrypt_hash, password_matches, MAX_PASSWORD_BYTES,
};

pub struct IdentityService {
    store: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl IdentityService {
    pub fn new(store: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Register a new user. The session is left untouched: signing up does
    /// not log the visitor in.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> DomainResult<UserRecord> {
        if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(DomainError::Validation(
                "username, email and password are required".into(),
            ));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(DomainError::Validation(format!(
                "password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        // Fail fast before paying for a bcrypt hash; `add` re-checks under its lock.
        if self.store.exists_email(email).await? {
            return Err(DomainError::DuplicateEmail(email.to_string()));
        }

        let password_hash = hash_password(password, self.bcrypt_cost)?;
        let user = self
            .store
            .add(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        metrics::counter!("signups_total").increment(1);
        info!(email = %user.email, username = %user.username, "New user registered");
        Ok(user)
    }

    /// Return the record whose email matches and whose password verifies.
    pub async fn authenticate(&self, email: &str, password: &str) -> DomainResult<UserRecord> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Err(DomainError::AuthFailed);
        };

        if !password_matches(password, &user.password_hash) {
            return Err(DomainError::AuthFailed);
        }
        if !is_bcrypt_hash(&user.password_hash) {
            warn!(email, "Authenticated against a plaintext password row");
        }
        Ok(user)
    }

    /// `Anonymous --login--> Authenticated(username)`. On failure the session
    /// keeps its previous state.
    pub async fn login(&self, session: &mut AuthSession, email: &str, password: &str) -> DomainResult<UserRecord> {
        match self.authenticate(email, password).await {
            Ok(user) => {
                session.login(&user);
                metrics::counter!("logins_total", "outcome" => "success").increment(1);
                info!(session_id = session.id(), username = %user.username, "Login succeeded");
                Ok(user)
            }
            Err(e) => {
                metrics::counter!("logins_total", "outcome" => "failure").increment(1);
                info!(session_id = session.id(), "Login failed");
                Err(e)
            }
        }
    }

    /// `Authenticated --logout--> Anonymous`
    pub fn logout(&self, session: &mut AuthSession) {
        if let Some(username) = session.active_username() {
            info!(session_id = session.id(), username, "Logout");
        }
        session.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionState;
    use crate::infrastructure::{CsvUserStore, DatabaseConfig, SeaOrmUserStore};

    async fn service() -> IdentityService {
        let store = SeaOrmUserStore::open(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        IdentityService::new(Arc::new(store), 4)
    }

    #[tokio::test]
    async fn signup_then_login_authenticates() {
        let svc = service().await;
        svc.signup("A", "a@x.com", "p1").await.unwrap();
        assert!(svc.store().exists_email("a@x.com").await.unwrap());

        let mut session = AuthSession::new("s1");
        svc.login(&mut session, "a@x.com", "p1").await.unwrap();
        assert_eq!(
            session.state(),
            &SessionState::Authenticated {
                username: "A".into(),
                email: "a@x.com".into()
            }
        );
    }

    #[tokio::test]
    async fn signup_does_not_authenticate() {
        let svc = service().await;
        let session = AuthSession::new("s1");
        svc.signup("A", "a@x.com", "p1").await.unwrap();
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn second_signup_with_same_email_fails() {
        let svc = service().await;
        svc.signup("A", "a@x.com", "p1").await.unwrap();

        let err = svc.signup("B", "a@x.com", "p2").await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEmail(_)));
        assert_eq!(svc.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_password_fails_and_stays_anonymous() {
        let svc = service().await;
        svc.signup("A", "a@x.com", "p1").await.unwrap();

        let mut session = AuthSession::new("s1");
        let err = svc.login(&mut session, "a@x.com", "p2").await.unwrap_err();
        assert!(matches!(err, DomainError::AuthFailed));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn unknown_email_fails() {
        let svc = service().await;
        assert!(matches!(
            svc.authenticate("ghost@x.com", "p1").await,
            Err(DomainError::AuthFailed)
        ));
    }

    #[tokio::test]
    async fn stored_password_is_hashed() {
        let svc = service().await;
        let user = svc.signup("A", "a@x.com", "p1").await.unwrap();
        assert_ne!(user.password_hash, "p1");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn logout_returns_to_anonymous() {
        let svc = service().await;
        svc.signup("A", "a@x.com", "p1").await.unwrap();
        let mut session = AuthSession::new("s1");
        svc.login(&mut session, "a@x.com", "p1").await.unwrap();

        svc.logout(&mut session);
        assert_eq!(session.state(), &SessionState::Anonymous);
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let svc = service().await;
        assert!(matches!(
            svc.signup("", "a@x.com", "p1").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn passwords_longer_than_bcrypt_reads_are_rejected_at_signup() {
        let svc = service().await;
        let long = format!("{}A", "x".repeat(MAX_PASSWORD_BYTES));
        assert!(matches!(
            svc.signup("A", "a@x.com", &long).await,
            Err(DomainError::Validation(_))
        ));
        assert_eq!(svc.store().count().await.unwrap(), 0);

        let limit = "x".repeat(MAX_PASSWORD_BYTES);
        svc.signup("A", "a@x.com", &limit).await.unwrap();
        svc.authenticate("a@x.com", &limit).await.unwrap();
    }

    #[tokio::test]
    async fn passwords_sharing_a_long_prefix_do_not_collide() {
        let svc = service().await;
        let prefix = "x".repeat(MAX_PASSWORD_BYTES);
        // A row hashed by a build that let bcrypt truncate the input.
        svc.store()
            .add(NewUser {
                username: "A".into(),
                email: "a@x.com".into(),
                password_hash: bcrypt::hash(format!("{}A", prefix), 4).unwrap(),
            })
            .await
            .unwrap();

        let mut session = AuthSession::new("s1");
        let err = svc
            .login(&mut session, "a@x.com", &format!("{}B", prefix))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AuthFailed));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn legacy_plaintext_row_authenticates_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        std::fs::write(&path, "username,email_id,password\nA,a@x.com,p1\n").unwrap();
        let svc = IdentityService::new(Arc::new(CsvUserStore::new(&path)), 4);

        let mut session = AuthSession::new("s1");
        svc.login(&mut session, "a@x.com", "p1").await.unwrap();
        assert_eq!(session.active_username(), Some("A"));

        for wrong in ["p2", "P1", "p1 ", ""] {
            assert!(matches!(
                svc.authenticate("a@x.com", wrong).await,
                Err(DomainError::AuthFailed)
            ));
        }
    }

    #[tokio::test]
    async fn legacy_rows_coexist_with_hashed_signups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        std::fs::write(&path, "username,email_id,password\nA,a@x.com,p1\n").unwrap();
        let svc = IdentityService::new(Arc::new(CsvUserStore::new(&path)), 4);

        svc.signup("B", "b@x.com", "p2").await.unwrap();
        svc.authenticate("a@x.com", "p1").await.unwrap();
        svc.authenticate("b@x.com", "p2").await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("A,a@x.com,p1"));
        assert!(!raw.contains("b@x.com,p2"));
    }
}
