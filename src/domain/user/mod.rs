//! User aggregate
//!
//! Contains the user record, the signup DTO, and the store interface.

pub mod model;
pub mod repository;

mod dto_create;

pub use dto_create::NewUser;
pub use model::UserRecord;
pub use repository::UserStore;
