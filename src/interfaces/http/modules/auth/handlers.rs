//! Authentication API handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};

use super::dto::{LoginRequest, SignupRequest, UserInfo};
use crate::application::IdentityService;
use crate::domain::{AuthSession, SessionState};
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::SessionLayerState;

#[derive(Clone)]
pub struct AuthHandlerState {
    pub identity: Arc<IdentityService>,
    pub sessions: SessionLayerState,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "Authentication",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered; the visitor still has to log in", body = ApiResponse<UserInfo>),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Missing field")
    )
)]
pub async fn signup(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ApiError<UserInfo>> {
    let user = state
        .identity
        .signup(&request.username, &request.email, &request.password)
        .await
        .map_err(domain_error)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = ApiResponse<SessionState>),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    Extension(mut session): Extension<AuthSession>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(HeaderMap, Json<ApiResponse<SessionState>>), ApiError<SessionState>> {
    state
        .identity
        .login(&mut session, &request.email, &request.password)
        .await
        .map_err(domain_error)?;
    state.sessions.registry.save(&session);

    let mut headers = HeaderMap::new();
    if let Some(cookie) = state.sessions.issue_cookie(session.id()) {
        headers.insert(header::SET_COOKIE, cookie);
    }
    Ok((headers, Json(ApiResponse::success(session.state().clone()))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Session is anonymous again", body = ApiResponse<SessionState>)
    )
)]
pub async fn logout(
    State(state): State<AuthHandlerState>,
    Extension(mut session): Extension<AuthSession>,
) -> (HeaderMap, Json<ApiResponse<SessionState>>) {
    state.identity.logout(&mut session);
    state.sessions.registry.remove(session.id());

    let mut headers = HeaderMap::new();
    if let Some(cookie) = state.sessions.clear_cookie() {
        headers.insert(header::SET_COOKIE, cookie);
    }
    (headers, Json(ApiResponse::success(session.state().clone())))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    tag = "Authentication",
    responses(
        (status = 200, description = "Current session state", body = ApiResponse<SessionState>)
    )
)]
pub async fn current_session(
    Extension(session): Extension<AuthSession>,
) -> Json<ApiResponse<SessionState>> {
    Json(ApiResponse::success(session.state().clone()))
}
