//! Registry persistence abstraction

use crate::error::TenantResult;
use crate::model::{Coupon, RegistryEntry};
use crate::name::TenantName;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Durable storage behind the registry.
///
/// Implementations only persist; read-modify-write atomicity comes from the
/// per-key locks in [`RegistryStore`](super::RegistryStore). Failures are
/// reported as `TenantError::RegistryUnavailable`.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Get tenant entry
    async fn load_tenant(&self, name: &TenantName) -> TenantResult<Option<RegistryEntry>>;

    /// Insert or replace tenant entry
    async fn save_tenant(&self, entry: &RegistryEntry) -> TenantResult<()>;

    /// Remove tenant entry
    async fn delete_tenant(&self, name: &TenantName) -> TenantResult<()>;

    /// List registered tenants
    async fn list_tenants(&self) -> TenantResult<Vec<TenantName>>;

    /// Get coupon by normalized code
    async fn load_coupon(&self, code: &str) -> TenantResult<Option<Coupon>>;

    /// Insert or replace coupon
    async fn save_coupon(&self, coupon: &Coupon) -> TenantResult<()>;

    /// Persist a redeemed coupon together with the tenant it was applied to
    async fn save_redemption(&self, entry: &RegistryEntry, coupon: &Coupon) -> TenantResult<()>;
}

/// In-memory registry (for testing and development)
pub struct InMemoryRegistry {
    tenants: RwLock<HashMap<TenantName, RegistryEntry>>,
    coupons: RwLock<HashMap<String, Coupon>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
            coupons: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryBackend for InMemoryRegistry {
    async fn load_tenant(&self, name: &TenantName) -> TenantResult<Option<RegistryEntry>> {
        Ok(self.tenants.read().get(name).cloned())
    }

    async fn save_tenant(&self, entry: &RegistryEntry) -> TenantResult<()> {
        self.tenants
            .write()
            .insert(entry.name.clone(), entry.clone());
        Ok(())
    }

    async fn delete_tenant(&self, name: &TenantName) -> TenantResult<()> {
        self.tenants.write().remove(name);
        Ok(())
    }

    async fn list_tenants(&self) -> TenantResult<Vec<TenantName>> {
        let mut names: Vec<_> = self.tenants.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn load_coupon(&self, code: &str) -> TenantResult<Option<Coupon>> {
        Ok(self.coupons.read().get(code).cloned())
    }

    async fn save_coupon(&self, coupon: &Coupon) -> TenantResult<()> {
        self.coupons
            .write()
            .insert(coupon.code.clone(), coupon.clone());
        Ok(())
    }

    async fn save_redemption(&self, entry: &RegistryEntry, coupon: &Coupon) -> TenantResult<()> {
        // Lock order matches the store: coupon, then tenant
        let mut coupons = self.coupons.write();
        let mut tenants = self.tenants.write();
        coupons.insert(coupon.code.clone(), coupon.clone());
        tenants.insert(entry.name.clone(), entry.clone());
        Ok(())
    }
}
