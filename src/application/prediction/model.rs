//! Trained model artifact, stored as JSON next to the service.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::domain::insurance::FEATURE_NAMES;
use crate::domain::RegionEncoding;
use crate::shared::{AppError, InfraError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelMetrics {
    pub r2_test: f64,
    pub r2_train: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub intercept: f64,
    /// One weight per entry of `feature_names`
    pub coefficients: Vec<f64>,
    /// Region table the coefficients were fitted with
    #[serde(default = "legacy_region_encoding")]
    pub region_encoding: RegionEncoding,
    pub metrics: ModelMetrics,
    #[serde(default)]
    pub dataset_sha256: String,
    pub trained_at: DateTime<Utc>,
}

/// Artifacts written before the table was recorded were fitted with the
/// legacy codes.
fn legacy_region_encoding() -> RegionEncoding {
    RegionEncoding::LegacyTraining
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Model(format!("{}: {}", path.display(), e)))?;
        let artifact: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::Model(format!("{}: {}", path.display(), e)))?;
        artifact.validate()?;
        info!(
            path = %path.display(),
            r2_test = artifact.metrics.r2_test,
            region_encoding = ?artifact.region_encoding,
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(InfraError::from)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(InfraError::from)?;
        std::fs::write(path, json).map_err(InfraError::from)?;
        info!(path = %path.display(), "Model artifact written");
        Ok(())
    }

    /// Feature names must match the serving column order exactly.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.feature_names != FEATURE_NAMES {
            return Err(AppError::Model(format!(
                "feature order {:?} does not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.coefficients.len() != FEATURE_NAMES.len() {
            return Err(AppError::Model(format!(
                "expected {} coefficients, found {}",
                FEATURE_NAMES.len(),
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(AppError::Model("non-finite weight".to_string()));
        }
        Ok(())
    }
}
