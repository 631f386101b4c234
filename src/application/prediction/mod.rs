//! Prediction module: model artifact, trainer and the serving wrapper

pub mod model;
pub mod service;
pub mod training;

pub use model::{ModelArtifact, ModelMetrics};
pub use service::PredictionService;
pub use training::{train, TrainingOptions};
