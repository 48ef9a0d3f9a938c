//! In-memory storage engine (for testing and development)

use super::{StorageEngine, TenantStore};
use crate::error::StoreError;
use crate::name::TenantName;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// In-memory tenant store
pub struct MemoryStore {
    tenant: TenantName,
    data: RwLock<BTreeMap<String, Value>>,
}

#[async_trait]
impl TenantStore for MemoryStore {
    fn tenant(&self) -> &TenantName {
        &self.tenant
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.data.read().keys().cloned().collect())
    }
}

/// In-memory storage engine.
///
/// Data of a tenant lives as long as the engine, so reopening after a pool
/// shutdown sees earlier writes.
pub struct MemoryEngine {
    stores: RwLock<HashMap<TenantName, Arc<MemoryStore>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Whether storage exists for the tenant
    pub fn contains(&self, tenant: &TenantName) -> bool {
        self.stores.read().contains_key(tenant)
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    async fn open(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError> {
        let store = self
            .stores
            .read()
            .get(tenant)
            .cloned()
            .ok_or_else(|| StoreError::Missing(tenant.clone()))?;
        Ok(store)
    }

    async fn exists(&self, tenant: &TenantName) -> Result<bool, StoreError> {
        Ok(self.contains(tenant))
    }

    async fn create(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError> {
        let store = self
            .stores
            .write()
            .entry(tenant.clone())
            .or_insert_with(|| {
                Arc::new(MemoryStore {
                    tenant: tenant.clone(),
                    data: RwLock::new(BTreeMap::new()),
                })
            })
            .clone();
        Ok(store)
    }

    async fn close(&self, _store: Arc<dyn TenantStore>) -> Result<(), StoreError> {
        Ok(())
    }
}
