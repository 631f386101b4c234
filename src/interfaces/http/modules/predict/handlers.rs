//! Prediction API handler

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::debug;

use super::dto::{ModelInfo, PredictRequest, PredictResponse, RegionCode};
use crate::application::PredictionService;
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};

#[derive(Clone)]
pub struct PredictState {
    pub predictor: Arc<PredictionService>,
    /// Fingerprint of the dataset loaded at startup
    pub dataset_sha256: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/predict",
    tag = "Prediction",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Estimated yearly charges", body = ApiResponse<PredictResponse>),
        (status = 401, description = "Login required"),
        (status = 422, description = "Value outside the form range")
    )
)]
pub async fn predict(
    State(state): State<PredictState>,
    ValidatedJson(request): ValidatedJson<PredictRequest>,
) -> Json<ApiResponse<PredictResponse>> {
    let features = state.predictor.encode(
        request.age,
        request.sex,
        request.bmi,
        request.children,
        request.smoker,
        request.region,
    );
    let result = state.predictor.predict(&features);
    debug!(?features, cost = result.cost_estimate, "Prediction served");

    Json(ApiResponse::success(PredictResponse {
        cost_estimate: result.cost_estimate,
        display: result.display(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/model",
    tag = "Prediction",
    responses(
        (status = 200, description = "Served model metadata", body = ApiResponse<ModelInfo>),
        (status = 401, description = "Login required")
    )
)]
pub async fn model_info(State(state): State<PredictState>) -> Json<ApiResponse<ModelInfo>> {
    let artifact = state.predictor.artifact();
    let info = ModelInfo {
        feature_names: artifact.feature_names.clone(),
        intercept: artifact.intercept,
        coefficients: artifact.coefficients.clone(),
        region_encoding: artifact.region_encoding,
        region_codes: artifact
            .region_encoding
            .table()
            .into_iter()
            .map(|(region, code)| RegionCode { region, code })
            .collect(),
        metrics: artifact.metrics.clone(),
        trained_at: artifact.trained_at.to_rfc3339(),
        trained_on_served_dataset: !artifact.dataset_sha256.is_empty()
            && artifact.dataset_sha256 == state.dataset_sha256,
    };
    Json(ApiResponse::success(info))
}
