//! API Models

use chrono::{DateTime, Utc};
use ledgerhub_tenant::{Redemption, RegistryEntry};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard API response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                allowed_paths: None,
            }),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// Paths still writable, present on `trial_expired`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_paths: Option<Vec<String>>,
}

// ============ Tenants ============

/// Tenant registration request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterTenant {
    /// Requested subdomain
    pub name: String,
}

/// Tenant as seen by its own users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantView {
    pub name: String,
    /// `trialing`, `active`, `expired` or `free`; `legacy` when unregistered
    pub status: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub discount_percent: Option<u32>,
    pub coupons: Vec<String>,
    /// Writes outside the allow-list are blocked
    pub locked: bool,
}

impl TenantView {
    pub fn from_entry(entry: &RegistryEntry, locked: bool) -> Self {
        Self {
            name: entry.name.to_string(),
            status: entry.effective_status(Utc::now()).as_str().to_string(),
            trial_ends_at: entry.trial_ends_at,
            discount_percent: entry.discount_percent,
            coupons: entry.coupons.clone(),
            locked,
        }
    }

    /// View of a tenant that has storage but no registry entry
    pub fn legacy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: "legacy".into(),
            trial_ends_at: None,
            discount_percent: None,
            coupons: Vec::new(),
            locked: false,
        }
    }
}

// ============ Billing ============

/// Coupon redemption request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedeemCoupon {
    pub code: String,
}

/// Coupon redemption result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedemptionView {
    pub code: String,
    /// `trial_extension`, `free_access` or `discount`
    pub kind: String,
    /// Outcome classification, e.g. `trial_extended`
    pub outcome: String,
    /// Text to show the user
    pub message: String,
}

impl From<Redemption> for RedemptionView {
    fn from(redemption: Redemption) -> Self {
        Self {
            kind: redemption.kind.as_str().to_string(),
            outcome: redemption.outcome.as_str().to_string(),
            message: redemption.outcome.message(),
            code: redemption.code,
        }
    }
}

// ============ Records ============

/// Value stored in the tenant's dataset
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Record {
    pub key: String,
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}
