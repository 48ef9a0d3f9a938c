//! LedgerHub HTTP API
//!
//! Thin HTTP boundary over the tenancy layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           LEDGERHUB API                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  TraceLayer → resolve_tenant (ambient scope for the request)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │        │ public                          │ session-bound              │
//! │  ┌─────▼────────────────┐   ┌────────────▼──────────────────────────┐  │
//! │  │ /health              │   │ require_session → enforce_entitlement │  │
//! │  │ /api-docs/openapi.json│   │   /api/tenant                         │  │
//! │  │ POST /api/tenants    │   │   /api/billing/redeem                 │  │
//! │  └──────────────────────┘   │   /api/records/{key}                  │  │
//! │                             └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod session;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use ledgerhub_tenant::Tenancy;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use session::SessionCodec;

/// API state
pub struct ApiState {
    pub tenancy: Tenancy,
    pub sessions: SessionCodec,
}

impl ApiState {
    pub fn new(tenancy: Tenancy, sessions: SessionCodec) -> Self {
        Self { tenancy, sessions }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "LedgerHub API",
        version = "1.0.0",
        description = "LedgerHub multi-tenant API",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::tenants::register_tenant,
        routes::tenants::current_tenant,
        routes::billing::redeem_coupon,
        routes::records::get_record,
        routes::records::put_record,
    ),
    components(
        schemas(
            ErrorResponse,
            RegisterTenant, TenantView,
            RedeemCoupon, RedemptionView,
            Record,
            routes::health::HealthResponse
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tenants", description = "Tenant registration and status"),
        (name = "billing", description = "Coupons and billing"),
        (name = "records", description = "Tenant dataset")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/api/tenants", post(routes::tenants::register_tenant))
        .merge(tenant_routes(state.clone()))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::tenant::resolve_tenant,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes that need a session bound to the request tenant. The session check
/// runs before the entitlement gate.
fn tenant_routes(state: Arc<ApiState>) -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/tenant", get(routes::tenants::current_tenant))
        .route("/api/billing/redeem", post(routes::billing::redeem_coupon))
        .route(
            "/api/records/:key",
            get(routes::records::get_record).put(routes::records::put_record),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::entitlement::enforce_entitlement,
        ))
        .layer(from_fn_with_state(state, middleware::auth::require_session))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
