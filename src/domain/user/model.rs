use chrono::{DateTime, Utc};

/// A registered dashboard user.
///
/// `email` is the unique key. Records are created on signup and never
/// updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    /// bcrypt hash of the password
    pub password_hash: String,
    /// `None` for backends that do not record it (the CSV store)
    pub created_at: Option<DateTime<Utc>>,
}
