//! Prediction DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::prediction::ModelMetrics;
use crate::domain::{Region, RegionEncoding, Sex, Smoker};

/// Form values. Ranges mirror the input widgets; categoricals are the
/// dataset labels (`male`, `yes`, `northeast`, ...).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PredictRequest {
    #[validate(range(min = 18, max = 100, message = "age must be between 18 and 100"))]
    pub age: u32,
    pub sex: Sex,
    #[validate(range(min = 10.0, max = 60.0, message = "bmi must be between 10 and 60"))]
    pub bmi: f64,
    #[validate(range(min = 0, max = 10, message = "children must be between 0 and 10"))]
    pub children: u32,
    pub smoker: Smoker,
    pub region: Region,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PredictResponse {
    pub cost_estimate: f64,
    /// e.g. `$8,462.13`
    pub display: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionCode {
    pub region: Region,
    pub code: u8,
}

/// Metadata of the model being served
#[derive(Debug, Serialize, ToSchema)]
pub struct ModelInfo {
    pub feature_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub region_encoding: RegionEncoding,
    pub region_codes: Vec<RegionCode>,
    pub metrics: ModelMetrics,
    pub trained_at: String,
    /// Whether the artifact was fitted on the dataset the dashboard shows
    pub trained_on_served_dataset: bool,
}
