//! LedgerHub Tenant Context & Isolation Layer
//!
//! Every customer gets a subdomain, an isolated data store, and a billing
//! record in a shared registry.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          REQUEST PIPELINE                               │
//! │                                                                         │
//! │   Host: acme.ledgerhub.app                                              │
//! │        │                                                                │
//! │  ┌─────▼──────┐   ┌──────────────┐   ┌──────────────┐   ┌───────────┐  │
//! │  │  Resolver  │──►│ SessionGuard │──►│EntitlementGate│──►│  Handler  │  │
//! │  │ (ambient   │   │ session.tenant│   │ expired? write│   │           │  │
//! │  │  tenant)   │   │ == ambient   │   │ allow-listed? │   │           │  │
//! │  └────────────┘   └──────────────┘   └──────┬───────┘   └─────┬─────┘  │
//! │                                             │                 │        │
//! │  ┌──────────────────────────────────────────▼──────┐  ┌───────▼──────┐ │
//! │  │                 REGISTRY STORE                  │  │  STORE POOL  │ │
//! │  │  tenant → status, trial end, coupons ledger     │  │ one handle   │ │
//! │  │  coupon → type, value, redeemed_by              │  │ per tenant   │ │
//! │  └─────────────────────────────────────────────────┘  └──────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod context;
pub mod coupon;
pub mod error;
pub mod gate;
pub mod model;
pub mod name;
pub mod pool;
pub mod registrar;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod tenancy;

pub use config::{Deployment, TenancyConfig};
pub use context::{current_tenant, require_tenant};
pub use coupon::{CouponEngine, Redemption, RedemptionOutcome};
pub use error::{NameRejection, StoreError, TenantError, TenantResult};
pub use gate::EntitlementGate;
pub use model::{Coupon, CouponKind, RegistryEntry, TenantStatus};
pub use name::TenantName;
pub use pool::TenantStorePool;
pub use registrar::Registrar;
pub use registry::RegistryStore;
pub use resolver::TenantResolver;
pub use session::{Session, SessionGuard};
pub use storage::{StorageEngine, TenantStore};
pub use tenancy::Tenancy;
