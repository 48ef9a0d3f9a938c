//! Tenancy layer assembly
//!
//! Wires registry, pool, resolver, gate, coupon engine and registrar from a
//! [`TenancyConfig`] and owns their startup/shutdown order.

use crate::config::TenancyConfig;
use crate::coupon::CouponEngine;
use crate::error::TenantResult;
use crate::gate::EntitlementGate;
use crate::pool::TenantStorePool;
use crate::registrar::Registrar;
use crate::registry::RegistryStore;
use crate::resolver::TenantResolver;
use crate::storage::{DirectoryEngine, MemoryEngine, StorageEngine};
use std::sync::Arc;
use tracing::info;

/// Assembled tenancy layer
#[derive(Clone)]
pub struct Tenancy {
    pub config: Arc<TenancyConfig>,
    pub registry: Arc<RegistryStore>,
    pub pool: TenantStorePool,
    pub resolver: Arc<TenantResolver>,
    pub gate: Arc<EntitlementGate>,
    pub coupons: Arc<CouponEngine>,
    pub registrar: Arc<Registrar>,
}

impl Tenancy {
    /// Open the file registry and directory storage named in `config`
    pub async fn open(config: TenancyConfig) -> TenantResult<Self> {
        let registry = RegistryStore::open_file(&config.registry_path).await?;
        let engine = DirectoryEngine::new(&config.data_dir);
        Self::assemble(config, Arc::new(registry), Arc::new(engine)).await
    }

    /// Fully in-memory tenancy layer
    pub async fn in_memory(config: TenancyConfig) -> TenantResult<Self> {
        Self::assemble(
            config,
            Arc::new(RegistryStore::in_memory()),
            Arc::new(MemoryEngine::new()),
        )
        .await
    }

    /// Assemble from explicit collaborators and seed configured coupons
    pub async fn assemble(
        config: TenancyConfig,
        registry: Arc<RegistryStore>,
        engine: Arc<dyn StorageEngine>,
    ) -> TenantResult<Self> {
        let mut seeded = 0;
        for coupon in &config.coupons {
            if registry.seed_coupon(coupon.clone()).await? {
                seeded += 1;
            }
        }

        let pool = TenantStorePool::new(engine);
        let resolver = TenantResolver::new(&config.base_domain);
        let gate = EntitlementGate::new(registry.clone())
            .with_enforcement(config.deployment.enforces_trials())
            .with_allowed_paths(config.allowed_when_expired.iter().cloned());
        let coupons = CouponEngine::new(registry.clone());
        let registrar = Registrar::new(
            registry.clone(),
            pool.clone(),
            config.trial_days,
            config.deployment,
        );

        info!(
            base_domain = %resolver.base_domain(),
            deployment = ?config.deployment,
            coupons_seeded = seeded,
            "tenancy layer ready"
        );

        Ok(Self {
            config: Arc::new(config),
            registry,
            pool,
            resolver: Arc::new(resolver),
            gate: Arc::new(gate),
            coupons: Arc::new(coupons),
            registrar: Arc::new(registrar),
        })
    }

    /// Close every tenant store, then the registry
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
        self.registry.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Deployment;
    use crate::error::TenantError;
    use crate::model::{Coupon, CouponKind};
    use crate::name::TenantName;

    #[tokio::test]
    async fn test_file_backed_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = TenancyConfig {
            data_dir: dir.path().join("tenants"),
            registry_path: dir.path().join("registry.json"),
            coupons: vec![Coupon::new("WELCOME", CouponKind::Discount, 10)],
            ..TenancyConfig::default()
        };

        let tenancy = Tenancy::open(config.clone()).await.unwrap();
        tenancy.registrar.register("acme").await.unwrap();
        tenancy
            .coupons
            .redeem("welcome", &TenantName::parse("acme").unwrap())
            .await
            .unwrap();
        tenancy.shutdown().await;

        let reopened = Tenancy::open(config).await.unwrap();
        let acme = TenantName::parse("acme").unwrap();
        let entry = reopened.registry.entry(&acme).await.unwrap().unwrap();
        assert_eq!(entry.discount_percent, Some(10));
        let coupon = reopened.registry.coupon("WELCOME").await.unwrap().unwrap();
        assert_eq!(coupon.redemption_count, 1);
        assert!(reopened.pool.acquire(&acme).await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_closes_registry() {
        let tenancy = Tenancy::in_memory(TenancyConfig::default()).await.unwrap();
        tenancy.shutdown().await;

        let err = tenancy.registrar.register("acme").await.unwrap_err();
        assert!(matches!(err, TenantError::RegistryUnavailable(_)));
    }

    #[tokio::test]
    async fn test_self_hosted_gate_disabled() {
        let config = TenancyConfig {
            deployment: Deployment::SelfHosted,
            ..TenancyConfig::default()
        };
        let tenancy = Tenancy::in_memory(config).await.unwrap();
        assert!(!tenancy.gate.is_enforcing());
    }
}
