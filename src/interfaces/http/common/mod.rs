//! Shared HTTP building blocks: response envelope, error mapping and
//! the validating JSON extractor.

pub mod validated_json;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::DomainError;

pub use validated_json::ValidatedJson;

/// Standard API response wrapper
///
/// Every REST endpoint answers inside this envelope.
/// On success: `{"success": true, "data": {...}}`,
/// on failure: `{"success": false, "data": null, "error": "..."}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error half of every handler result
pub type ApiError<T> = (StatusCode, Json<ApiResponse<T>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError<T>>;

pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::DuplicateEmail(_) => StatusCode::CONFLICT,
        DomainError::AuthFailed | DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a domain error onto the envelope. Internal details are logged,
/// not returned.
pub fn domain_error<T>(e: DomainError) -> ApiError<T> {
    let status = status_for(&e);
    let message = if e.is_user_facing() || matches!(e, DomainError::NotFound { .. }) {
        e.to_string()
    } else {
        error!(error = %e, "Request failed");
        "Internal server error".to_string()
    };
    (status, Json(ApiResponse::error(message)))
}
