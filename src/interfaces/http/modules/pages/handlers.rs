//! Page navigation handler

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::debug;

use crate::application::{PageController, Resolution};
use crate::domain::{AuthSession, Page};
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult};

#[derive(Clone)]
pub struct PagesState {
    pub controller: PageController,
}

#[utoipa::path(
    get,
    path = "/api/v1/pages/{page}",
    tag = "Pages",
    params(("page" = String, Path, description = "`login`, `signup`, `predict`, `dashboard` or `dashboard/<tab>`")),
    responses(
        (status = 200, description = "Page the visitor lands on, after any redirect", body = ApiResponse<Resolution>),
        (status = 404, description = "Unknown page")
    )
)]
pub async fn navigate(
    State(state): State<PagesState>,
    Extension(session): Extension<AuthSession>,
    Path(page): Path<String>,
) -> ApiResult<Resolution> {
    let requested: Page = page.parse().map_err(domain_error)?;
    let resolution = state.controller.resolve(&session, requested);
    if resolution.redirected {
        debug!(session_id = session.id(), requested = %page, "Navigation redirected");
    }
    Ok(Json(ApiResponse::success(resolution)))
}
