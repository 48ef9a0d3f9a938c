//! Tenant Store Pool
//!
//! Lazily opens one store per tenant and caches it for the life of the
//! process.
//!
//! ```text
//!   acquire(acme) ──┐
//!   acquire(acme) ──┼──► slot[acme] = Pending(watch rx) ◄── spawned init task
//!   acquire(acme) ──┘                                        │
//!                                                            ▼
//!                        slot[acme] = Ready(store)   or   slot removed (failure)
//! ```
//!
//! Initialization runs on its own task, so a waiter that is dropped (client
//! disconnect) does not cancel it. Failures are broadcast to the waiters of
//! that attempt and then forgotten; the next caller starts a fresh attempt.
//!
//! After [`TenantStorePool::shutdown`] no new initialization starts, and one
//! that was already running closes its store instead of caching it.

use crate::error::{TenantError, TenantResult};
use crate::name::TenantName;
use crate::storage::{StorageEngine, TenantStore};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

type InitOutcome = Option<Result<Arc<dyn TenantStore>, String>>;

const SHUT_DOWN: &str = "store pool is shut down";

enum Slot {
    Ready(Arc<dyn TenantStore>),
    Pending(watch::Receiver<InitOutcome>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitMode {
    /// Open existing storage (request path)
    Open,
    /// Create storage if absent (registration)
    Create,
}

/// Per-tenant store cache with single-flight initialization
#[derive(Clone)]
pub struct TenantStorePool {
    engine: Arc<dyn StorageEngine>,
    slots: Arc<DashMap<TenantName, Slot>>,
    closed: Arc<AtomicBool>,
}

impl TenantStorePool {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            slots: Arc::new(DashMap::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the tenant's store, opening it on first use
    pub async fn acquire(&self, tenant: &TenantName) -> TenantResult<Arc<dyn TenantStore>> {
        self.load(tenant, InitMode::Open).await
    }

    /// Create the tenant's backing storage and cache its store
    pub async fn provision(&self, tenant: &TenantName) -> TenantResult<Arc<dyn TenantStore>> {
        self.load(tenant, InitMode::Create).await
    }

    /// Whether the tenant has backing storage, cached or not
    pub async fn has_storage(&self, tenant: &TenantName) -> TenantResult<bool> {
        if self.is_loaded(tenant) {
            return Ok(true);
        }
        self.engine
            .exists(tenant)
            .await
            .map_err(|e| TenantError::StoreInitializationFailed {
                tenant: tenant.clone(),
                reason: e.to_string(),
            })
    }

    /// Whether a store is cached for the tenant
    pub fn is_loaded(&self, tenant: &TenantName) -> bool {
        matches!(
            self.slots.get(tenant).as_deref(),
            Some(Slot::Ready(_))
        )
    }

    /// Tenants with a cached store
    pub fn loaded_tenants(&self) -> Vec<TenantName> {
        let mut names: Vec<_> = self
            .slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready(_)))
            .map(|slot| slot.key().clone())
            .collect();
        names.sort();
        names
    }

    async fn load(&self, tenant: &TenantName, mode: InitMode) -> TenantResult<Arc<dyn TenantStore>> {
        // A create that joined someone else's failed open retries with its
        // own attempt
        let mut retry_after_join = mode == InitMode::Create;

        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(TenantError::StoreInitializationFailed {
                    tenant: tenant.clone(),
                    reason: SHUT_DOWN.into(),
                });
            }

            let (rx, joined) = match self.slots.entry(tenant.clone()) {
                Entry::Occupied(slot) => match slot.get() {
                    Slot::Ready(store) => return Ok(store.clone()),
                    Slot::Pending(rx) => (rx.clone(), true),
                },
                Entry::Vacant(vacant) => {
                    let (tx, rx) = watch::channel(None);
                    vacant.insert(Slot::Pending(rx.clone()));
                    self.spawn_init(tenant.clone(), mode, tx);
                    (rx, false)
                }
            };

            match self.wait(tenant, rx).await {
                Err(_) if joined && retry_after_join => {
                    retry_after_join = false;
                    debug!(tenant = %tenant, "joined initialization failed, retrying with create");
                }
                result => return result,
            }
        }
    }

    fn spawn_init(&self, tenant: TenantName, mode: InitMode, tx: watch::Sender<InitOutcome>) {
        let engine = self.engine.clone();
        let slots = self.slots.clone();
        let closed = self.closed.clone();

        tokio::spawn(async move {
            let result = match mode {
                InitMode::Open => engine.open(&tenant).await,
                InitMode::Create => engine.create(&tenant).await,
            };

            let outcome = match result {
                Ok(store) => {
                    slots.insert(tenant.clone(), Slot::Ready(store.clone()));
                    if closed.load(Ordering::SeqCst) {
                        // Shutdown started while opening; whoever removes the
                        // slot closes the store
                        let removed = slots.remove_if(&tenant, |_, slot| {
                            matches!(slot, Slot::Ready(cached) if Arc::ptr_eq(cached, &store))
                        });
                        if let Some((_, Slot::Ready(store))) = removed {
                            if let Err(e) = engine.close(store).await {
                                warn!(tenant = %tenant, error = %e, "failed to close tenant store");
                            }
                        }
                        debug!(tenant = %tenant, "initialization finished after shutdown");
                        Err(SHUT_DOWN.to_string())
                    } else {
                        info!(tenant = %tenant, mode = ?mode, "tenant store initialized");
                        Ok(store)
                    }
                }
                Err(e) => {
                    slots.remove_if(&tenant, |_, slot| matches!(slot, Slot::Pending(_)));
                    warn!(tenant = %tenant, mode = ?mode, error = %e, "tenant store initialization failed");
                    Err(e.to_string())
                }
            };
            // No receivers left is fine, the slot already holds the outcome
            let _ = tx.send(Some(outcome));
        });
    }

    async fn wait(
        &self,
        tenant: &TenantName,
        mut rx: watch::Receiver<InitOutcome>,
    ) -> TenantResult<Arc<dyn TenantStore>> {
        let outcome = match rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(Ok(store)) => Ok(store),
            Some(Err(reason)) => Err(TenantError::StoreInitializationFailed {
                tenant: tenant.clone(),
                reason,
            }),
            None => {
                // Init task ended without reporting (panicked)
                self.slots
                    .remove_if(tenant, |_, slot| matches!(slot, Slot::Pending(_)));
                Err(TenantError::StoreInitializationFailed {
                    tenant: tenant.clone(),
                    reason: "initialization aborted".into(),
                })
            }
        }
    }

    /// Close every cached store and refuse further loads. Called once at
    /// process shutdown.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let tenants: Vec<_> = self.slots.iter().map(|slot| slot.key().clone()).collect();
        let mut count = 0;
        for tenant in tenants {
            let Some((_, Slot::Ready(store))) = self.slots.remove(&tenant) else {
                continue;
            };
            count += 1;
            if let Err(e) = self.engine.close(store).await {
                warn!(tenant = %tenant, error = %e, "failed to close tenant store");
            }
        }
        info!(stores = count, "tenant store pool shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::MemoryEngine;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Engine wrapper that counts and slows down initializations, and can be
    /// told to fail
    struct SlowEngine {
        inner: MemoryEngine,
        opens: AtomicUsize,
        creates: AtomicUsize,
        closes: AtomicUsize,
        delay: Duration,
        failing: Mutex<HashSet<TenantName>>,
    }

    impl SlowEngine {
        fn new(delay: Duration) -> Self {
            Self {
                inner: MemoryEngine::new(),
                opens: AtomicUsize::new(0),
                creates: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                delay,
                failing: Mutex::new(HashSet::new()),
            }
        }
    }

    #[async_trait]
    impl StorageEngine for SlowEngine {
        async fn open(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.failing.lock().contains(tenant) {
                return Err(StoreError::Corrupt {
                    tenant: tenant.clone(),
                    reason: "bad header".into(),
                });
            }
            self.inner.open(tenant).await
        }

        async fn exists(&self, tenant: &TenantName) -> Result<bool, StoreError> {
            self.inner.exists(tenant).await
        }

        async fn create(&self, tenant: &TenantName) -> Result<Arc<dyn TenantStore>, StoreError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.inner.create(tenant).await
        }

        async fn close(&self, store: Arc<dyn TenantStore>) -> Result<(), StoreError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.close(store).await
        }
    }

    fn name(raw: &str) -> TenantName {
        TenantName::parse(raw).unwrap()
    }

    async fn setup(delay: Duration, tenants: &[&str]) -> (Arc<SlowEngine>, TenantStorePool) {
        let engine = Arc::new(SlowEngine::new(delay));
        for tenant in tenants {
            engine.inner.create(&name(tenant)).await.unwrap();
        }
        let pool = TenantStorePool::new(engine.clone());
        (engine, pool)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_initializes_once() {
        let (engine, pool) = setup(Duration::from_millis(50), &["acme"]).await;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move { pool.acquire(&name("acme")).await }));
        }
        let mut stores = Vec::new();
        for task in tasks {
            stores.push(task.await.unwrap().unwrap());
        }

        assert_eq!(engine.opens.load(Ordering::SeqCst), 1);
        assert_eq!(stores.len(), 16);
        assert!(stores.iter().all(|s| Arc::ptr_eq(s, &stores[0])));
        assert!(pool.is_loaded(&name("acme")));
    }

    #[tokio::test]
    async fn test_cached_store_reused() {
        let (engine, pool) = setup(Duration::ZERO, &["acme"]).await;

        let first = pool.acquire(&name("acme")).await.unwrap();
        let second = pool.acquire(&name("acme")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_different_tenants_initialize_in_parallel() {
        let (engine, pool) = setup(Duration::from_millis(200), &["acme", "globex", "initech"]).await;

        let (acme, globex, initech) = (name("acme"), name("globex"), name("initech"));
        let started = std::time::Instant::now();
        let (a, b, c) = tokio::join!(
            pool.acquire(&acme),
            pool.acquire(&globex),
            pool.acquire(&initech),
        );
        let elapsed = started.elapsed();

        assert_eq!(a.unwrap().tenant(), &name("acme"));
        assert_eq!(b.unwrap().tenant(), &name("globex"));
        assert_eq!(c.unwrap().tenant(), &name("initech"));
        assert_eq!(engine.opens.load(Ordering::SeqCst), 3);
        assert!(elapsed < Duration::from_millis(550), "initializations were serialized: {elapsed:?}");
        assert_eq!(
            pool.loaded_tenants(),
            vec![name("acme"), name("globex"), name("initech")]
        );
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let (engine, pool) = setup(Duration::ZERO, &["acme"]).await;
        engine.failing.lock().insert(name("acme"));

        let failed = pool.acquire(&name("acme")).await;
        assert!(matches!(failed, Err(TenantError::StoreInitializationFailed { .. })));
        assert!(!pool.is_loaded(&name("acme")));

        engine.failing.lock().clear();
        assert!(pool.acquire(&name("acme")).await.is_ok());
        assert_eq!(engine.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_waiters_share_failure() {
        let (engine, pool) = setup(Duration::from_millis(50), &["acme"]).await;
        engine.failing.lock().insert(name("acme"));

        let acme = name("acme");
        let (a, b) = tokio::join!(pool.acquire(&acme), pool.acquire(&acme));

        assert!(matches!(a, Err(TenantError::StoreInitializationFailed { .. })));
        assert!(matches!(b, Err(TenantError::StoreInitializationFailed { .. })));
        assert_eq!(engine.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_storage_fails_acquire() {
        let (_engine, pool) = setup(Duration::ZERO, &[]).await;

        let err = pool.acquire(&name("ghost")).await.err().unwrap();
        assert_eq!(err.code(), "store_initialization_failed");
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_abort_init() {
        let (engine, pool) = setup(Duration::from_millis(50), &["acme"]).await;

        let timed_out =
            tokio::time::timeout(Duration::from_millis(5), pool.acquire(&name("acme"))).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(pool.is_loaded(&name("acme")));

        pool.acquire(&name("acme")).await.unwrap();
        assert_eq!(engine.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provision_creates_storage() {
        let (engine, pool) = setup(Duration::ZERO, &[]).await;

        pool.provision(&name("newco")).await.unwrap();

        assert!(engine.inner.contains(&name("newco")));
        assert!(pool.is_loaded(&name("newco")));
        pool.acquire(&name("newco")).await.unwrap();
        assert_eq!(engine.opens.load(Ordering::SeqCst), 0);
        assert_eq!(engine.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_provision_retries_after_joined_open_fails() {
        let (engine, pool) = setup(Duration::from_millis(50), &[]).await;

        let opener = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire(&name("newco")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let provisioned = pool.provision(&name("newco")).await;

        assert!(opener.await.unwrap().is_err());
        assert!(provisioned.is_ok());
        assert_eq!(engine.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_each_store_once() {
        let (engine, pool) = setup(Duration::ZERO, &["acme", "globex"]).await;
        pool.acquire(&name("acme")).await.unwrap();
        pool.acquire(&name("globex")).await.unwrap();
        pool.acquire(&name("acme")).await.unwrap();

        pool.shutdown().await;

        assert_eq!(engine.closes.load(Ordering::SeqCst), 2);
        assert!(pool.loaded_tenants().is_empty());
    }

    #[tokio::test]
    async fn test_acquire_after_shutdown_fails() {
        let (engine, pool) = setup(Duration::ZERO, &["acme"]).await;
        pool.shutdown().await;

        let result = pool.acquire(&name("acme")).await;

        assert!(matches!(result, Err(TenantError::StoreInitializationFailed { .. })));
        assert_eq!(engine.opens.load(Ordering::SeqCst), 0);
        assert!(!pool.is_loaded(&name("acme")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_closes_store_still_initializing() {
        let (engine, pool) = setup(Duration::from_millis(50), &["acme"]).await;

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire(&name("acme")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        pool.shutdown().await;

        assert!(waiter.await.unwrap().is_err());
        assert_eq!(engine.opens.load(Ordering::SeqCst), 1);
        assert_eq!(engine.closes.load(Ordering::SeqCst), 1);
        assert!(pool.loaded_tenants().is_empty());
    }

    #[tokio::test]
    async fn test_has_storage() {
        let (engine, pool) = setup(Duration::ZERO, &["acme"]).await;

        assert!(pool.has_storage(&name("acme")).await.unwrap());
        assert!(!pool.has_storage(&name("ghost")).await.unwrap());
        assert_eq!(engine.opens.load(Ordering::SeqCst), 0);
    }
}
