pub mod auth;
pub mod dashboard;
pub mod health;
pub mod metrics;
pub mod pages;
pub mod predict;
pub mod request_id;
