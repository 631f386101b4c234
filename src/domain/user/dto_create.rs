/// Input for [`UserStore::add`](super::UserStore::add). The password is
/// already hashed by the identity service.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
