//! Ambient request tenant
//!
//! The resolver binds the request's tenant (or the absence of one) to the
//! task that processes the request. Everything awaited inside that scope can
//! read it with [`current_tenant`]; other requests, even on the same worker
//! thread, see their own value.

use crate::error::{TenantError, TenantResult};
use crate::name::TenantName;
use std::future::Future;

tokio::task_local! {
    static REQUEST_TENANT: Option<TenantName>;
}

/// Run `fut` with `tenant` as the ambient request tenant
pub async fn scope<F>(tenant: Option<TenantName>, fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_TENANT.scope(tenant, fut).await
}

/// Tenant of the current request, `None` for apex/marketing traffic or
/// outside a request scope
pub fn current_tenant() -> Option<TenantName> {
    REQUEST_TENANT.try_with(|tenant| tenant.clone()).ok().flatten()
}

/// Tenant of the current request, failing if no scope was established.
///
/// Used by components that must only run after the resolver.
pub fn established_tenant() -> TenantResult<Option<TenantName>> {
    REQUEST_TENANT
        .try_with(|tenant| tenant.clone())
        .map_err(|_| TenantError::ContextNotEstablished)
}

/// Tenant of the current request, failing when the request has none
pub fn require_tenant() -> TenantResult<TenantName> {
    established_tenant()?.ok_or(TenantError::NoTenant)
}
