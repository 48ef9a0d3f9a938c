//! Tenant resolution middleware

use crate::ApiState;
use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::middleware::Next;
use axum::response::Response;
use ledgerhub_tenant::context;
use std::sync::Arc;

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Resolve the request's tenant from its host and run the rest of the
/// pipeline inside that tenant's ambient scope
pub async fn resolve_tenant(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Response {
    let tenant = request_host(&req).and_then(|host| state.tenancy.resolver.resolve(&host));
    context::scope(tenant, next.run(req)).await
}

fn request_host(req: &Request) -> Option<String> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            // Proxies may append; the first hop is the client-facing host
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
    };

    header(FORWARDED_HOST)
        .or_else(|| header(HOST.as_str()))
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
}
