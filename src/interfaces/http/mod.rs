//! HTTP REST API interfaces
//!
//! - `common`: response envelope and validated JSON extractor
//! - `middleware`: session cookie resolution and login guard
//! - `modules`: handlers grouped by feature
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDoc, AppServices};
