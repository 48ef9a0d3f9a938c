//! Tenancy Configuration

use crate::gate::DEFAULT_ALLOWED_PATHS;
use crate::model::Coupon;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deployment {
    /// Hosted SaaS: new tenants start on a trial, expiry is enforced
    #[default]
    MultiTenant,
    /// Single-tenant install: no trials, nothing is ever locked
    SelfHosted,
}

impl Deployment {
    pub fn enforces_trials(&self) -> bool {
        matches!(self, Self::MultiTenant)
    }
}

/// Tenancy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Domain tenants are subdomains of
    pub base_domain: String,
    pub deployment: Deployment,
    /// Trial length for new tenants
    pub trial_days: u32,
    /// Root of per-tenant storage
    pub data_dir: PathBuf,
    /// Registry file
    pub registry_path: PathBuf,
    /// Paths writable while a tenant is locked
    pub allowed_when_expired: Vec<String>,
    /// Coupons issued at startup unless already present
    pub coupons: Vec<Coupon>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            base_domain: "ledgerhub.localhost".into(),
            deployment: Deployment::MultiTenant,
            trial_days: 14,
            data_dir: PathBuf::from("/var/lib/ledgerhub/tenants"),
            registry_path: PathBuf::from("/var/lib/ledgerhub/registry.json"),
            allowed_when_expired: DEFAULT_ALLOWED_PATHS.iter().map(|p| p.to_string()).collect(),
            coupons: Vec::new(),
        }
    }
}
