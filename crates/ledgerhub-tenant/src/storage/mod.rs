//! Tenant storage engine
//!
//! The pool only sees these traits; the actual engine behind a tenant's
//! isolated dataset is pluggable.

mod directory;
mod memory;

pub use directory::{DirectoryEngine, DirectoryStore};
pub use memory::{MemoryEngine, MemoryStore};

use crate::error::StoreError;
use crate::name::TenantName;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Handle to one tenant's isolated data
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Tenant this store belongs to
    fn tenant(&self) -> &TenantName;

    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a value
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// List keys in order
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Opens and creates per-tenant stores
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Open existing storage, `StoreError::Missing` if there is none
    async fn open(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError>;

    /// Whether backing storage exists, without opening it
    async fn exists(&self, tenant: &TenantName) -> Result<bool, StoreError>;

    /// Create storage if absent, then open it
    async fn create(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError>;

    /// Release a store at shutdown
    async fn close(&self, store: Arc<dyn TenantStore>) -> Result<(), StoreError>;
}
