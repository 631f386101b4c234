use std::path::Path;

use tracing::warn;

use super::model::ModelArtifact;
use crate::domain::{FeatureVector, PredictionResult, Region, RegionEncoding, Sex, Smoker};
use crate::shared::AppError;

/// Serves a loaded artifact. Predictions are a pure function of the input.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifact: ModelArtifact,
}

impl PredictionService {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, AppError> {
        artifact.validate()?;
        if artifact.region_encoding == RegionEncoding::LegacyTraining {
            warn!(
                training_table = ?RegionEncoding::LegacyTraining.table(),
                serving_default = ?RegionEncoding::Alphabetical.table(),
                "Model was trained with the legacy region codes; encoding requests with the \
                 artifact's table. Retrain to switch to the default table"
            );
        }
        Ok(Self { artifact })
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        Self::from_artifact(ModelArtifact::load(path)?)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn region_encoding(&self) -> RegionEncoding {
        self.artifact.region_encoding
    }

    /// Encode raw form values with the table this model was fitted on.
    pub fn encode(
        &self,
        age: u32,
        sex: Sex,
        bmi: f64,
        children: u32,
        smoker: Smoker,
        region: Region,
    ) -> FeatureVector {
        FeatureVector::encode(age, sex, bmi, children, smoker, region, self.region_encoding())
    }

    pub fn predict(&self, features: &FeatureVector) -> PredictionResult {
        let cost_estimate = self.artifact.intercept
            + self
                .artifact
                .coefficients
                .iter()
                .zip(features.as_row())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        metrics::counter!("predictions_total").increment(1);
        PredictionResult { cost_estimate }
    }
}
