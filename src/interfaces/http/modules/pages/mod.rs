//! Pages module: session-aware navigation between login, signup,
//! dashboard tabs and the prediction form

pub mod handlers;

pub use handlers::*;
