//! Dashboard module: static dataset and the per-tab chart data derived from it

pub mod dataset;
pub mod renderer;
pub mod stats;

pub use dataset::Dataset;
pub use renderer::{DashboardRenderer, TabView};
