//! Tenant Registration
//!
//! Registration claims the name in the registry, then provisions storage
//! before reporting success. If provisioning fails the claim is rolled back
//! so the name can be registered again.
//!
//! A name with storage but no registry entry belongs to a legacy tenant and
//! is taken.

use crate::config::Deployment;
use crate::error::{TenantError, TenantResult};
use crate::model::RegistryEntry;
use crate::name::TenantName;
use crate::pool::TenantStorePool;
use crate::registry::RegistryStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Tenant registrar
pub struct Registrar {
    registry: Arc<RegistryStore>,
    pool: TenantStorePool,
    trial_days: u32,
    deployment: Deployment,
}

impl Registrar {
    pub fn new(
        registry: Arc<RegistryStore>,
        pool: TenantStorePool,
        trial_days: u32,
        deployment: Deployment,
    ) -> Self {
        Self {
            registry,
            pool,
            trial_days,
            deployment,
        }
    }

    /// Register a new tenant
    pub async fn register(&self, raw_name: &str) -> TenantResult<RegistryEntry> {
        let name = TenantName::parse(raw_name)?;
        if self.pool.has_storage(&name).await? {
            warn!(tenant = %name, "registration refused, storage already exists");
            return Err(TenantError::TenantNameTaken(name));
        }

        let now = Utc::now();
        let entry = if self.deployment.enforces_trials() {
            RegistryEntry::trialing(name.clone(), self.trial_days, now)?
        } else {
            RegistryEntry::active(name.clone(), now)
        };

        let entry = self.registry.create(entry).await?;

        if let Err(e) = self.pool.provision(&name).await {
            error!(tenant = %name, error = %e, "provisioning failed");
            if let Err(rollback) = self.registry.rollback_registration(&name).await {
                error!(tenant = %name, error = %rollback, "rollback failed");
            }
            return Err(e);
        }

        info!(
            tenant = %name,
            status = entry.status.as_str(),
            trial_ends_at = ?entry.trial_ends_at,
            "tenant registered"
        );
        Ok(entry)
    }
}
