//! Health check handler

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::SharedSessionRegistry;
use crate::domain::UserStore;

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn UserStore>,
    pub session_registry: SharedSessionRegistry,
    pub dataset_rows: usize,
    pub started_at: Arc<Instant>,
}

/// Service health response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub user_store: ComponentHealth,
    pub registered_users: Option<u64>,
    pub active_sessions: usize,
    pub authenticated_sessions: usize,
    pub dataset_rows: usize,
}

/// Component health status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "User store unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let uptime = state.started_at.elapsed().as_secs();

    // Counting users exercises the store on either backend.
    let store_start = Instant::now();
    let (user_store, registered_users) = match state.store.count().await {
        Ok(n) => (
            ComponentHealth {
                status: "ok".to_string(),
                latency_ms: Some(store_start.elapsed().as_millis() as u64),
            },
            Some(n),
        ),
        Err(_) => (
            ComponentHealth {
                status: "error".to_string(),
                latency_ms: None,
            },
            None,
        ),
    };

    let healthy = user_store.status == "ok";
    let http_status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime,
            user_store,
            registered_users,
            active_sessions: state.session_registry.len(),
            authenticated_sessions: state.session_registry.authenticated_count(),
            dataset_rows: state.dataset_rows,
        }),
    )
}
