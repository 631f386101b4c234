//! Page module: session-aware navigation

pub mod controller;

pub use controller::{PageController, PageView, Resolution, TabLink};
