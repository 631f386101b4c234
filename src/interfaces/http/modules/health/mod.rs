//! Health module: liveness and user store reachability

pub mod handlers;

pub use handlers::*;
