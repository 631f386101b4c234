//! Prediction module: cost estimate for one applicant

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
