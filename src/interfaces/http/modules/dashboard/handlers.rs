//! Dashboard API handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::application::page::TabLink;
use crate::application::{DashboardRenderer, TabView};
use crate::domain::TabKind;
use crate::interfaces::http::common::{domain_error, ApiResponse, ApiResult};

#[derive(Clone)]
pub struct DashboardState {
    pub renderer: DashboardRenderer,
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Available tabs in display order", body = ApiResponse<Vec<TabLink>>),
        (status = 401, description = "Login required")
    )
)]
pub async fn list_tabs() -> Json<ApiResponse<Vec<TabLink>>> {
    Json(ApiResponse::success(TabLink::all()))
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/{tab}",
    tag = "Dashboard",
    params(("tab" = String, Path, description = "Tab slug, e.g. `statistics`, `age`, `insights`")),
    responses(
        (status = 200, description = "Chart data for the tab", body = ApiResponse<TabView>),
        (status = 401, description = "Login required"),
        (status = 404, description = "Unknown tab")
    )
)]
pub async fn get_tab(
    State(state): State<DashboardState>,
    Path(tab): Path<String>,
) -> ApiResult<TabView> {
    let tab: TabKind = tab.parse().map_err(domain_error)?;
    Ok(Json(ApiResponse::success(state.renderer.render(tab))))
}
