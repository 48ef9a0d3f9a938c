//! JSON file registry
//!
//! The whole registry is one JSON document, rewritten through a temporary
//! file and an atomic rename on every change.

use super::backend::RegistryBackend;
use crate::error::{TenantError, TenantResult};
use crate::model::{Coupon, RegistryEntry};
use crate::name::TenantName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    tenants: BTreeMap<TenantName, RegistryEntry>,
    #[serde(default)]
    coupons: BTreeMap<String, Coupon>,
}

/// File-backed registry
pub struct FileRegistry {
    path: PathBuf,
    document: Mutex<RegistryDocument>,
}

impl FileRegistry {
    /// Open the registry file, starting empty when it does not exist
    pub async fn open(path: impl AsRef<Path>) -> TenantResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                TenantError::RegistryUnavailable(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryDocument::default(),
            Err(e) => return Err(unavailable(&path, e)),
        };

        info!(
            path = %path.display(),
            tenants = document.tenants.len(),
            coupons = document.coupons.len(),
            "registry opened"
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, document: &RegistryDocument) -> TenantResult<()> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| TenantError::RegistryUnavailable(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| unavailable(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| unavailable(&self.path, e))
    }

    /// Apply `f` to the document and persist it, leaving memory untouched if
    /// the write fails
    async fn write<F>(&self, f: F) -> TenantResult<()>
    where
        F: FnOnce(&mut RegistryDocument),
    {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        f(&mut next);
        self.persist(&next).await?;
        *document = next;
        Ok(())
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> TenantError {
    TenantError::RegistryUnavailable(format!("{}: {e}", path.display()))
}

#[async_trait]
impl RegistryBackend for FileRegistry {
    async fn load_tenant(&self, name: &TenantName) -> TenantResult<Option<RegistryEntry>> {
        Ok(self.document.lock().await.tenants.get(name).cloned())
    }

    async fn save_tenant(&self, entry: &RegistryEntry) -> TenantResult<()> {
        self.write(|doc| {
            doc.tenants.insert(entry.name.clone(), entry.clone());
        })
        .await
    }

    async fn delete_tenant(&self, name: &TenantName) -> TenantResult<()> {
        self.write(|doc| {
            doc.tenants.remove(name);
        })
        .await
    }

    async fn list_tenants(&self) -> TenantResult<Vec<TenantName>> {
        Ok(self.document.lock().await.tenants.keys().cloned().collect())
    }

    async fn load_coupon(&self, code: &str) -> TenantResult<Option<Coupon>> {
        Ok(self.document.lock().await.coupons.get(code).cloned())
    }

    async fn save_coupon(&self, coupon: &Coupon) -> TenantResult<()> {
        self.write(|doc| {
            doc.coupons.insert(coupon.code.clone(), coupon.clone());
        })
        .await
    }

    async fn save_redemption(&self, entry: &RegistryEntry, coupon: &Coupon) -> TenantResult<()> {
        self.write(|doc| {
            doc.coupons.insert(coupon.code.clone(), coupon.clone());
            doc.tenants.insert(entry.name.clone(), entry.clone());
        })
        .await
    }
}
