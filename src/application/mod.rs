pub mod dashboard;
pub mod identity;
pub mod page;
pub mod prediction;
pub mod session;

// Re-export key types for convenience
pub use dashboard::{DashboardRenderer, Dataset, TabView};
pub use identity::IdentityService;
pub use page::{PageController, PageView, Resolution};
pub use prediction::{ModelArtifact, PredictionService, TrainingOptions};
pub use session::{SessionRegistry, SharedSessionRegistry};
