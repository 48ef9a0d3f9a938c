//! Registry Data Model

use crate::error::{TenantError, TenantResult};
use crate::name::TenantName;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Billing / trial status of a registered tenant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Trialing,
    Active,
    Expired,
    Free,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Free => "free",
        }
    }
}

/// Registry record of one tenant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryEntry {
    /// Tenant name (subdomain)
    pub name: TenantName,
    /// Stored status
    pub status: TenantStatus,
    /// End of the trial period
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// External billing reference, informational only
    pub stripe_subscription_id: Option<String>,
    /// Discount recorded by a coupon, applied by billing at next checkout
    #[serde(default)]
    pub discount_percent: Option<u32>,
    /// Applied coupon codes, in redemption order
    #[serde(default)]
    pub coupons: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistryEntry {
    /// New tenant on a trial of `trial_days`
    pub fn trialing(name: TenantName, trial_days: u32, now: DateTime<Utc>) -> TenantResult<Self> {
        Ok(Self {
            status: TenantStatus::Trialing,
            trial_ends_at: Some(trial_end(now, trial_days)?),
            ..Self::active(name, now)
        })
    }

    /// New tenant with no trial (self-hosted deployments)
    pub fn active(name: TenantName, now: DateTime<Utc>) -> Self {
        Self {
            name,
            status: TenantStatus::Active,
            trial_ends_at: None,
            stripe_subscription_id: None,
            discount_percent: None,
            coupons: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Status after applying trial expiry at `now`.
    ///
    /// A trialing tenant whose trial end has passed is expired even if the
    /// stored status has not been updated yet. The subscription id does not
    /// influence the result.
    pub fn effective_status(&self, now: DateTime<Utc>) -> TenantStatus {
        match (self.status, self.trial_ends_at) {
            (TenantStatus::Trialing, Some(end)) if end <= now => TenantStatus::Expired,
            (status, _) => status,
        }
    }

    /// Whether writes outside the allow-list are blocked
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == TenantStatus::Expired
    }

    /// Whether a coupon code is in the ledger
    pub fn has_coupon(&self, code: &str) -> bool {
        self.coupons.iter().any(|c| c == code)
    }
}

/// `from` plus `days`, or `TrialOutOfRange` past the last representable date
pub fn trial_end(from: DateTime<Utc>, days: u32) -> TenantResult<DateTime<Utc>> {
    from.checked_add_signed(Duration::days(i64::from(days)))
        .ok_or(TenantError::TrialOutOfRange { days })
}

/// Effect a coupon has when redeemed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// Extend the trial by `value` days
    TrialExtension,
    /// Permanent free access
    FreeAccess,
    /// Discount of `value` percent at next checkout
    Discount,
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrialExtension => "trial_extension",
            Self::FreeAccess => "free_access",
            Self::Discount => "discount",
        }
    }
}

/// Redeemable coupon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique code, stored upper-case
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    /// Days for extensions, percent for discounts
    #[serde(default)]
    pub value: u32,
    pub max_redemptions: Option<u32>,
    #[serde(default)]
    pub redeemed_by: BTreeSet<TenantName>,
    #[serde(default)]
    pub redemption_count: u32,
}

impl Coupon {
    pub fn new(code: &str, kind: CouponKind, value: u32) -> Self {
        Self {
            code: normalize_code(code),
            kind,
            value,
            max_redemptions: None,
            redeemed_by: BTreeSet::new(),
            redemption_count: 0,
        }
    }

    /// Limit total redemptions across all tenants
    pub fn with_max_redemptions(mut self, max: u32) -> Self {
        self.max_redemptions = Some(max);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_redemptions
            .is_some_and(|max| self.redemption_count >= max)
    }

    pub fn is_redeemed_by(&self, tenant: &TenantName) -> bool {
        self.redeemed_by.contains(tenant)
    }
}

/// Coupon codes are case-insensitive
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
