//! Dashboard module: per-tab chart data over the static dataset

pub mod handlers;

pub use handlers::*;
