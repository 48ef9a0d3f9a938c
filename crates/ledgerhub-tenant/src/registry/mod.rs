//! Tenant registry
//!
//! Shared record of every tenant's billing/trial state and of the coupon
//! ledger. Writers serialize on per-key async locks:
//!
//! - tenant writers (registration, billing updates) take the tenant lock
//! - redemption takes the coupon lock, then the tenant lock
//!
//! so read-modify-write cycles on one key never interleave while unrelated
//! tenants proceed in parallel.

mod backend;
mod file;

pub use backend::{InMemoryRegistry, RegistryBackend};
pub use file::FileRegistry;

use crate::error::{TenantError, TenantResult};
use crate::model::{normalize_code, Coupon, RegistryEntry};
use crate::name::TenantName;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Async locks keyed by string
#[derive(Default)]
struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

/// Registry store
pub struct RegistryStore {
    backend: Arc<dyn RegistryBackend>,
    tenant_locks: KeyedLocks,
    coupon_locks: KeyedLocks,
    closed: AtomicBool,
}

impl RegistryStore {
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self {
            backend,
            tenant_locks: KeyedLocks::default(),
            coupon_locks: KeyedLocks::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Registry over an in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRegistry::new()))
    }

    /// Registry over a JSON file
    pub async fn open_file(path: impl AsRef<std::path::Path>) -> TenantResult<Self> {
        Ok(Self::new(Arc::new(FileRegistry::open(path).await?)))
    }

    fn ensure_open(&self) -> TenantResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TenantError::RegistryUnavailable("registry is closed".into()));
        }
        Ok(())
    }

    /// Get entry for tenant, `None` for legacy tenants
    pub async fn entry(&self, name: &TenantName) -> TenantResult<Option<RegistryEntry>> {
        self.ensure_open()?;
        self.backend.load_tenant(name).await
    }

    /// List registered tenants
    pub async fn tenants(&self) -> TenantResult<Vec<TenantName>> {
        self.ensure_open()?;
        self.backend.list_tenants().await
    }

    /// Insert a new entry, failing if the name is taken
    pub async fn create(&self, entry: RegistryEntry) -> TenantResult<RegistryEntry> {
        self.ensure_open()?;
        let _guard = self.tenant_locks.lock(entry.name.as_str()).await;

        if self.backend.load_tenant(&entry.name).await?.is_some() {
            return Err(TenantError::TenantNameTaken(entry.name));
        }
        self.backend.save_tenant(&entry).await?;

        info!(tenant = %entry.name, status = entry.status.as_str(), "registry entry created");
        Ok(entry)
    }

    /// Atomically read, modify and write a tenant entry.
    ///
    /// The entry is only persisted when `f` succeeds.
    pub async fn update<T, F>(&self, name: &TenantName, f: F) -> TenantResult<T>
    where
        F: FnOnce(&mut RegistryEntry) -> TenantResult<T>,
    {
        self.ensure_open()?;
        let _guard = self.tenant_locks.lock(name.as_str()).await;

        let mut entry = self
            .backend
            .load_tenant(name)
            .await?
            .ok_or_else(|| TenantError::TenantNotRegistered(name.clone()))?;
        let out = f(&mut entry)?;
        entry.updated_at = Utc::now();
        self.backend.save_tenant(&entry).await?;
        Ok(out)
    }

    /// Remove an entry whose registration could not be completed
    pub(crate) async fn rollback_registration(&self, name: &TenantName) -> TenantResult<()> {
        self.ensure_open()?;
        let _guard = self.tenant_locks.lock(name.as_str()).await;
        self.backend.delete_tenant(name).await?;
        warn!(tenant = %name, "registration rolled back");
        Ok(())
    }

    /// Get coupon by code (case-insensitive)
    pub async fn coupon(&self, code: &str) -> TenantResult<Option<Coupon>> {
        self.ensure_open()?;
        self.backend.load_coupon(&normalize_code(code)).await
    }

    /// Issue or replace a coupon
    pub async fn put_coupon(&self, mut coupon: Coupon) -> TenantResult<()> {
        self.ensure_open()?;
        coupon.code = normalize_code(&coupon.code);
        let _guard = self.coupon_locks.lock(&coupon.code).await;
        self.backend.save_coupon(&coupon).await?;
        debug!(code = %coupon.code, kind = coupon.kind.as_str(), "coupon stored");
        Ok(())
    }

    /// Issue a coupon unless one with the same code exists.
    ///
    /// Returns whether the coupon was stored.
    pub async fn seed_coupon(&self, mut coupon: Coupon) -> TenantResult<bool> {
        self.ensure_open()?;
        coupon.code = normalize_code(&coupon.code);
        let _guard = self.coupon_locks.lock(&coupon.code).await;
        if self.backend.load_coupon(&coupon.code).await?.is_some() {
            return Ok(false);
        }
        self.backend.save_coupon(&coupon).await?;
        Ok(true)
    }

    /// Run `f` on a coupon and a tenant entry while holding both locks, then
    /// persist both in one write.
    ///
    /// Missing coupon and missing entry are reported before `f` runs.
    pub(crate) async fn redeem_atomically<T, F>(
        &self,
        code: &str,
        name: &TenantName,
        f: F,
    ) -> TenantResult<T>
    where
        F: FnOnce(&mut Coupon, &mut RegistryEntry) -> TenantResult<T>,
    {
        self.ensure_open()?;
        let code = normalize_code(code);
        let _coupon_guard = self.coupon_locks.lock(&code).await;
        let _tenant_guard = self.tenant_locks.lock(name.as_str()).await;

        let mut coupon = self
            .backend
            .load_coupon(&code)
            .await?
            .ok_or_else(|| TenantError::CouponNotFound(code.clone()))?;
        let mut entry = self
            .backend
            .load_tenant(name)
            .await?
            .ok_or_else(|| TenantError::TenantNotRegistered(name.clone()))?;

        let out = f(&mut coupon, &mut entry)?;
        entry.updated_at = Utc::now();
        self.backend.save_redemption(&entry, &coupon).await?;
        Ok(out)
    }

    /// Close the registry; later calls fail with `RegistryUnavailable`
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("registry closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CouponKind, TenantStatus};

    fn name(raw: &str) -> TenantName {
        TenantName::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let registry = RegistryStore::in_memory();
        let entry = RegistryEntry::trialing(name("acme"), 14, Utc::now()).unwrap();

        registry.create(entry.clone()).await.unwrap();

        assert_eq!(registry.entry(&name("acme")).await.unwrap(), Some(entry));
        assert_eq!(registry.entry(&name("globex")).await.unwrap(), None);
        assert_eq!(registry.tenants().await.unwrap(), vec![name("acme")]);
    }

    #[tokio::test]
    async fn test_create_taken() {
        let registry = RegistryStore::in_memory();
        registry
            .create(RegistryEntry::trialing(name("acme"), 14, Utc::now()).unwrap())
            .await
            .unwrap();

        let err = registry
            .create(RegistryEntry::active(name("acme"), Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::TenantNameTaken(_)));
    }

    #[tokio::test]
    async fn test_update_is_all_or_nothing() {
        let registry = RegistryStore::in_memory();
        registry
            .create(RegistryEntry::trialing(name("acme"), 14, Utc::now()).unwrap())
            .await
            .unwrap();

        let err = registry
            .update(&name("acme"), |entry| {
                entry.status = TenantStatus::Active;
                Err::<(), _>(TenantError::NotAuthenticated)
            })
            .await;
        assert!(err.is_err());
        let entry = registry.entry(&name("acme")).await.unwrap().unwrap();
        assert_eq!(entry.status, TenantStatus::Trialing);

        registry
            .update(&name("acme"), |entry| {
                entry.status = TenantStatus::Active;
                entry.stripe_subscription_id = Some("sub_1".into());
                Ok(())
            })
            .await
            .unwrap();
        let entry = registry.entry(&name("acme")).await.unwrap().unwrap();
        assert_eq!(entry.status, TenantStatus::Active);

        let missing = registry.update(&name("globex"), |_| Ok(())).await;
        assert!(matches!(missing, Err(TenantError::TenantNotRegistered(_))));
    }

    #[tokio::test]
    async fn test_coupon_codes_are_case_insensitive() {
        let registry = RegistryStore::in_memory();
        registry
            .put_coupon(Coupon::new("extend30", CouponKind::TrialExtension, 30))
            .await
            .unwrap();

        assert!(registry.coupon("EXTEND30").await.unwrap().is_some());
        assert!(registry.coupon(" Extend30 ").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite() {
        let registry = RegistryStore::in_memory();
        let mut used = Coupon::new("WELCOME", CouponKind::Discount, 20);
        used.redemption_count = 3;
        registry.put_coupon(used).await.unwrap();

        let stored = registry
            .seed_coupon(Coupon::new("welcome", CouponKind::Discount, 50))
            .await
            .unwrap();
        assert!(!stored);
        let coupon = registry.coupon("WELCOME").await.unwrap().unwrap();
        assert_eq!(coupon.value, 20);
        assert_eq!(coupon.redemption_count, 3);
    }

    #[tokio::test]
    async fn test_closed_registry_is_unavailable() {
        let registry = RegistryStore::in_memory();
        registry.close();

        assert!(registry.is_closed());
        let err = registry.entry(&name("acme")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.code(), "registry_unavailable");
    }
}
