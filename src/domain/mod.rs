pub mod insurance;
pub mod page;
pub mod session;
pub mod user;

pub use insurance::{
    FeatureVector, InsuranceRecord, PredictionResult, Region, RegionEncoding, Sex, Smoker,
};
pub use page::{Page, TabKind};
pub use session::{AuthSession, SessionState};
pub use user::{NewUser, UserRecord, UserStore};

// Re-export errors from shared for convenience
pub use crate::shared::errors::{DomainError, DomainResult};
