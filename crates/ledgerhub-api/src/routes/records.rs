//! Tenant dataset access
//!
//! Stand-in for the finance handlers: reads and writes JSON values in the
//! current tenant's isolated store.

use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::ApiState;
use axum::extract::{Path, State};
use axum::Json;
use ledgerhub_tenant::require_tenant;
use std::sync::Arc;

/// Read a record
#[utoipa::path(
    get,
    path = "/api/records/{key}",
    params(("key" = String, Path, description = "Record key")),
    responses(
        (status = 200, description = "Record", body = Record),
        (status = 404, description = "No such record", body = ErrorResponse)
    ),
    tag = "records",
    security(("bearer" = []))
)]
pub async fn get_record(
    State(state): State<Arc<ApiState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<ApiResponse<Record>>> {
    let tenant = require_tenant()?;
    let store = state.tenancy.pool.acquire(&tenant).await?;

    let value = store
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("record {key}")))?;
    Ok(Json(ApiResponse::success(Record { key, value })))
}

/// Write a record
#[utoipa::path(
    put,
    path = "/api/records/{key}",
    params(("key" = String, Path, description = "Record key")),
    responses(
        (status = 200, description = "Record stored", body = Record),
        (status = 402, description = "Trial expired", body = ErrorResponse)
    ),
    tag = "records",
    security(("bearer" = []))
)]
pub async fn put_record(
    State(state): State<Arc<ApiState>>,
    Path(key): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> ApiResult<Json<ApiResponse<Record>>> {
    let tenant = require_tenant()?;
    let store = state.tenancy.pool.acquire(&tenant).await?;

    store.put(&key, value.clone()).await?;
    Ok(Json(ApiResponse::success(Record { key, value })))
}
