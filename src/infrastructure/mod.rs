//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod flatfile;

pub use database::{init_database, DatabaseConfig, SeaOrmUserStore};
pub use flatfile::CsvUserStore;
