//! Session-Tenant Binding
//!
//! A session remembers the tenant it was issued under. Replaying it against
//! another tenant's subdomain is an authentication failure even when the
//! session no longer looks authenticated.

use crate::context;
use crate::error::{TenantError, TenantResult};
use crate::name::TenantName;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Decoded session payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    /// Tenant the session was created under
    pub tenant: Option<TenantName>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl Session {
    /// Session with no credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated session bound to `tenant`
    pub fn authenticated(user_id: impl Into<String>, tenant: Option<TenantName>) -> Self {
        Self {
            authenticated: true,
            tenant,
            user_id: Some(user_id.into()),
            is_admin: false,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

/// Session guard
pub struct SessionGuard;

impl SessionGuard {
    /// Check a session against the request tenant.
    ///
    /// The tenant binding is checked first and independently of the
    /// authentication flag, so a stale session still carrying another
    /// tenant's name is rejected as cross-tenant.
    pub fn check(session: &Session, request_tenant: Option<&TenantName>) -> TenantResult<()> {
        if let (Some(session_tenant), Some(request_tenant)) = (session.tenant.as_ref(), request_tenant) {
            if session_tenant != request_tenant {
                warn!(
                    session_tenant = %session_tenant,
                    request_tenant = %request_tenant,
                    user = session.user_id.as_deref().unwrap_or("-"),
                    "cross-tenant session rejected"
                );
                return Err(TenantError::CrossTenantSession {
                    session_tenant: session_tenant.clone(),
                    request_tenant: request_tenant.clone(),
                });
            }
        }

        if !session.authenticated {
            return Err(TenantError::NotAuthenticated);
        }
        Ok(())
    }

    /// Check a session against the ambient request tenant
    pub fn check_current(session: &Session) -> TenantResult<()> {
        let tenant = context::established_tenant()?;
        Self::check(session, tenant.as_ref())
    }
}
