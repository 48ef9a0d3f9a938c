//! Tenant registration and self-info

use crate::error::ApiResult;
use crate::models::*;
use crate::ApiState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ledgerhub_tenant::require_tenant;
use std::sync::Arc;

/// Register a new tenant
#[utoipa::path(
    post,
    path = "/api/tenants",
    request_body = RegisterTenant,
    responses(
        (status = 201, description = "Tenant registered and provisioned", body = TenantView),
        (status = 409, description = "Name already taken", body = ErrorResponse),
        (status = 422, description = "Invalid or reserved name", body = ErrorResponse)
    ),
    tag = "tenants"
)]
pub async fn register_tenant(
    State(state): State<Arc<ApiState>>,
    Json(input): Json<RegisterTenant>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TenantView>>)> {
    let entry = state.tenancy.registrar.register(&input.name).await?;
    let locked = state.tenancy.gate.is_locked(&entry.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TenantView::from_entry(&entry, locked))),
    ))
}

/// Current tenant, including whether it is locked
#[utoipa::path(
    get,
    path = "/api/tenant",
    responses(
        (status = 200, description = "Tenant details", body = TenantView),
        (status = 401, description = "No session for this tenant", body = ErrorResponse),
        (status = 404, description = "Request is not for a tenant", body = ErrorResponse)
    ),
    tag = "tenants",
    security(("bearer" = []))
)]
pub async fn current_tenant(
    State(state): State<Arc<ApiState>>,
) -> ApiResult<Json<ApiResponse<TenantView>>> {
    let tenant = require_tenant()?;

    let view = match state.tenancy.registry.entry(&tenant).await? {
        Some(entry) => {
            let locked = state.tenancy.gate.is_locked(&tenant).await?;
            TenantView::from_entry(&entry, locked)
        }
        None => TenantView::legacy(tenant.as_str()),
    };
    Ok(Json(ApiResponse::success(view)))
}
