//! Visitor session management

pub mod registry;

pub use registry::{SessionRegistry, SharedSessionRegistry};
