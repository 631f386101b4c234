use async_trait::async_trait;

use super::{NewUser, UserRecord};
use crate::domain::DomainResult;

/// Persistent user store.
///
/// Implementations serialize writers so two concurrent signups for the same
/// email cannot both succeed.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Read every record, creating an empty store first when none exists.
    async fn load(&self) -> DomainResult<Vec<UserRecord>>;

    /// Exact, case-sensitive email match.
    async fn exists_email(&self, email: &str) -> DomainResult<bool>;

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>>;

    /// Persist a new record. Fails with `DomainError::DuplicateEmail` when
    /// the email is already registered.
    async fn add(&self, user: NewUser) -> DomainResult<UserRecord>;

    async fn count(&self) -> DomainResult<u64>;
}
