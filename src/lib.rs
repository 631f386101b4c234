//! # Medical Insurance Dashboard
//!
//! Login-gated web service that estimates yearly medical insurance charges
//! with a linear regression model and serves exploratory statistics over
//! the insurance dataset.
//!
//! ## Architecture
//!
//! - **domain**: records, encodings, sessions, pages and the user store port
//! - **application**: identity, sessions, prediction, training and dashboard
//! - **infrastructure**: bcrypt hashing, SQLite (SeaORM) and CSV user stores
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime bootstrap and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig, CONFIG_ENV_VAR};

pub use infrastructure::{init_database, CsvUserStore, DatabaseConfig, SeaOrmUserStore};

pub use interfaces::http::{create_api_router, AppServices};

pub use server::{init_tracing, ServerHandle, ServerOptions};
