//! Directory storage engine
//!
//! Each tenant gets `<root>/<tenant>/store.json`. Tenant names are validated
//! DNS labels, so they are always safe path components.

use super::{StorageEngine, TenantStore};
use crate::error::StoreError;
use crate::name::TenantName;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const STORE_FILE: &str = "store.json";

/// File-backed tenant store
pub struct DirectoryStore {
    tenant: TenantName,
    file: PathBuf,
    data: RwLock<BTreeMap<String, Value>>,
}

impl DirectoryStore {
    async fn load(tenant: &TenantName, file: PathBuf) -> Result<Self, StoreError> {
        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing(tenant.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let data = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            tenant: tenant.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            tenant: tenant.clone(),
            file,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

async fn write_atomic(file: &Path, data: &BTreeMap<String, Value>) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(data).map_err(std::io::Error::from)?;
    let tmp = file.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, file).await?;
    Ok(())
}

#[async_trait]
impl TenantStore for DirectoryStore {
    fn tenant(&self) -> &TenantName {
        &self.tenant
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        next.insert(key.to_string(), value);
        write_atomic(&self.file, &next).await?;
        *data = next;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.data.read().await.keys().cloned().collect())
    }
}

/// Storage engine keeping one directory per tenant
pub struct DirectoryEngine {
    root: PathBuf,
}

impl DirectoryEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn tenant_dir(&self, tenant: &TenantName) -> PathBuf {
        self.root.join(tenant.as_str())
    }
}

#[async_trait]
impl StorageEngine for DirectoryEngine {
    async fn open(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError> {
        let store = DirectoryStore::load(tenant, self.tenant_dir(tenant).join(STORE_FILE)).await?;
        debug!(tenant = %tenant, path = %store.path().display(), "store opened");
        Ok(Arc::new(store))
    }

    async fn exists(&self, tenant: &TenantName) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.tenant_dir(tenant).join(STORE_FILE)).await?)
    }

    async fn create(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError> {
        let dir = self.tenant_dir(tenant);
        tokio::fs::create_dir_all(&dir).await?;

        let file = dir.join(STORE_FILE);
        if !tokio::fs::try_exists(&file).await? {
            write_atomic(&file, &BTreeMap::new()).await?;
            debug!(tenant = %tenant, path = %file.display(), "store created");
        }
        self.open(tenant).await
    }

    async fn close(&self, store: Arc<dyn TenantStore>) -> Result<(), StoreError> {
        // Writes are persisted as they happen
        debug!(tenant = %store.tenant(), "store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DirectoryEngine::new(dir.path());
        let acme = TenantName::parse("acme").unwrap();

        assert!(!engine.exists(&acme).await.unwrap());
        let store = engine.create(&acme).await.unwrap();
        assert!(engine.exists(&acme).await.unwrap());
        store.put("account:1", json!({"name": "Checking"})).await.unwrap();
        drop(store);

        let reopened = engine.open(&acme).await.unwrap();
        assert_eq!(
            reopened.get("account:1").await.unwrap(),
            Some(json!({"name": "Checking"}))
        );
        assert_eq!(reopened.keys().await.unwrap(), vec!["account:1".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DirectoryEngine::new(dir.path());
        let acme = TenantName::parse("acme").unwrap();

        assert!(matches!(engine.open(&acme).await, Err(StoreError::Missing(_))));

        std::fs::create_dir_all(dir.path().join("acme")).unwrap();
        std::fs::write(dir.path().join("acme").join(STORE_FILE), b"not json").unwrap();
        assert!(matches!(
            engine.open(&acme).await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_keeps_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let engine = DirectoryEngine::new(dir.path());
        let acme = TenantName::parse("acme").unwrap();

        engine.create(&acme).await.unwrap().put("k", json!(1)).await.unwrap();
        let again = engine.create(&acme).await.unwrap();
        assert_eq!(again.get("k").await.unwrap(), Some(json!(1)));
    }
}
