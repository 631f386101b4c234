//! Identity module: signup, login and logout against the user store

pub mod service;

pub use service::IdentityService;
