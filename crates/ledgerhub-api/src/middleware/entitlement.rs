//! Entitlement middleware

use crate::error::ApiError;
use crate::ApiState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

/// Block writes for locked tenants outside the allow-list
pub async fn enforce_entitlement(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    state
        .tenancy
        .gate
        .check(req.method().as_str(), req.uri().path())
        .await?;
    Ok(next.run(req).await)
}
