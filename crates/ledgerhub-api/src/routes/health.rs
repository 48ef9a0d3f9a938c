//! Health check endpoint

use crate::ApiState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` once the registry is closed
    pub status: String,
    pub version: String,
    /// Tenant stores currently open
    pub loaded_tenants: usize,
    pub timestamp: String,
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let status = if state.tenancy.registry.is_closed() {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        loaded_tenants: state.tenancy.pool.loaded_tenants().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
