//! Billing endpoints

use crate::error::ApiResult;
use crate::models::*;
use crate::ApiState;
use axum::extract::State;
use axum::{Extension, Json};
use ledgerhub_tenant::{require_tenant, Session};
use std::sync::Arc;
use tracing::info;

/// Redeem a coupon for the current tenant
#[utoipa::path(
    post,
    path = "/api/billing/redeem",
    request_body = RedeemCoupon,
    responses(
        (status = 200, description = "Coupon applied", body = RedemptionView),
        (status = 404, description = "Unknown coupon", body = ErrorResponse),
        (status = 409, description = "Already redeemed by this tenant", body = ErrorResponse),
        (status = 410, description = "Coupon exhausted", body = ErrorResponse)
    ),
    tag = "billing",
    security(("bearer" = []))
)]
pub async fn redeem_coupon(
    State(state): State<Arc<ApiState>>,
    Extension(session): Extension<Session>,
    Json(input): Json<RedeemCoupon>,
) -> ApiResult<Json<ApiResponse<RedemptionView>>> {
    let tenant = require_tenant()?;
    let redemption = state.tenancy.coupons.redeem(&input.code, &tenant).await?;

    info!(
        tenant = %tenant,
        user = session.user_id.as_deref().unwrap_or("-"),
        code = %redemption.code,
        "redemption requested via api"
    );
    Ok(Json(ApiResponse::success(redemption.into())))
}
