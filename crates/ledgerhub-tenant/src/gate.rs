//! Entitlement Gate
//!
//! Blocks writes for tenants whose trial has lapsed. Reads are never
//! blocked, and account/billing paths stay writable so a locked tenant can
//! always pay.

use crate::context;
use crate::error::{TenantError, TenantResult};
use crate::model::RegistryEntry;
use crate::name::TenantName;
use crate::registry::RegistryStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Paths writable while a tenant is locked
pub const DEFAULT_ALLOWED_PATHS: &[&str] = &["/auth", "/tenant", "/billing", "/settings"];

const API_PREFIX: &str = "/api";

/// Entitlement gate
pub struct EntitlementGate {
    registry: Arc<RegistryStore>,
    enforce: bool,
    allowed_paths: Vec<String>,
}

impl EntitlementGate {
    pub fn new(registry: Arc<RegistryStore>) -> Self {
        Self {
            registry,
            enforce: true,
            allowed_paths: DEFAULT_ALLOWED_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Disable enforcement (self-hosted deployments)
    pub fn with_enforcement(mut self, enforce: bool) -> Self {
        self.enforce = enforce;
        self
    }

    /// Replace the allow-list
    pub fn with_allowed_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_paths = paths
            .into_iter()
            .map(|p| normalize_prefix(&p.into()))
            .collect();
        self
    }

    pub fn allowed_paths(&self) -> &[String] {
        &self.allowed_paths
    }

    pub fn is_enforcing(&self) -> bool {
        self.enforce
    }

    /// Check a request against the ambient tenant
    pub async fn check(&self, method: &str, path: &str) -> TenantResult<()> {
        let tenant = context::established_tenant()?;
        self.check_tenant(tenant.as_ref(), method, path).await
    }

    /// Check a request for an explicit tenant
    pub async fn check_tenant(
        &self,
        tenant: Option<&TenantName>,
        method: &str,
        path: &str,
    ) -> TenantResult<()> {
        if !self.enforce || !is_mutating(method) {
            return Ok(());
        }
        let Some(tenant) = tenant else {
            return Ok(());
        };
        if self.is_allowed(path) {
            return Ok(());
        }

        match self.registry.entry(tenant).await? {
            None => {
                debug!(tenant = %tenant, "legacy tenant, gate bypassed");
                Ok(())
            }
            Some(entry) if entry.is_locked(Utc::now()) => {
                info!(tenant = %tenant, method, path, "write blocked, trial expired");
                Err(TenantError::TrialExpired {
                    tenant: tenant.clone(),
                    allowed_paths: self.allowed_paths.clone(),
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Whether the tenant is currently locked out of writes
    pub async fn is_locked(&self, tenant: &TenantName) -> TenantResult<bool> {
        if !self.enforce {
            return Ok(false);
        }
        Ok(self
            .registry
            .entry(tenant)
            .await?
            .is_some_and(|entry: RegistryEntry| entry.is_locked(Utc::now())))
    }

    /// Whether `path` is writable while locked
    pub fn is_allowed(&self, path: &str) -> bool {
        let path = logical_path(path);
        self.allowed_paths
            .iter()
            .any(|prefix| matches_segment_prefix(path, prefix))
    }
}

/// Non-idempotent methods
pub fn is_mutating(method: &str) -> bool {
    !["GET", "HEAD", "OPTIONS", "TRACE"]
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method))
}

fn logical_path(path: &str) -> &str {
    match path.strip_prefix(API_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

fn matches_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
