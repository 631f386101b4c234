//! Insurance dataset vocabulary: records, categorical labels, encodings,
//! and the model input/output types.

pub mod encoding;
pub mod features;
pub mod record;

pub use encoding::{encode_sex, encode_smoker, RegionEncoding};
pub use features::{
    FeatureVector, PredictionResult, AGE_RANGE, BMI_RANGE, CHILDREN_RANGE, FEATURE_NAMES,
};
pub use record::{InsuranceRecord, Region, Sex, Smoker};
