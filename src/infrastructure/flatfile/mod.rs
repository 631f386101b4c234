//! File-backed storage

pub mod user_store;

pub use user_store::CsvUserStore;
