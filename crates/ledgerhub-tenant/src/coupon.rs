//! Coupon Redemption
//!
//! Validation, effect and ledger update happen in one registry write while
//! the coupon and tenant locks are held, so a coupon can never be applied
//! twice to the same tenant or beyond its redemption limit.

use crate::error::{TenantError, TenantResult};
use crate::model::{trial_end, Coupon, CouponKind, RegistryEntry, TenantStatus};
use crate::name::TenantName;
use crate::registry::RegistryStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// What a redemption did to the tenant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RedemptionOutcome {
    /// Trial pushed out, possibly reactivating an expired tenant
    TrialExtended {
        trial_ends_at: DateTime<Utc>,
        reactivated: bool,
    },
    /// Tenant moved to permanent free access
    FreeAccessGranted,
    /// Discount recorded for the next checkout
    DiscountRecorded { percent: u32 },
}

impl RedemptionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrialExtended { reactivated: false, .. } => "trial_extended",
            Self::TrialExtended { reactivated: true, .. } => "trial_reactivated",
            Self::FreeAccessGranted => "free_access_granted",
            Self::DiscountRecorded { .. } => "discount_recorded",
        }
    }

    /// Text for the redeeming user
    pub fn message(&self) -> String {
        match self {
            Self::TrialExtended { trial_ends_at, reactivated: false } => {
                format!("Your trial now ends on {}.", trial_ends_at.format("%Y-%m-%d"))
            }
            Self::TrialExtended { trial_ends_at, reactivated: true } => format!(
                "Your account is active again. Your trial now ends on {}.",
                trial_ends_at.format("%Y-%m-%d")
            ),
            Self::FreeAccessGranted => "Your account now has free access.".to_string(),
            Self::DiscountRecorded { percent } => {
                format!("A {percent}% discount will be applied at your next checkout.")
            }
        }
    }
}

/// Result of a successful redemption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redemption {
    pub code: String,
    pub kind: CouponKind,
    #[serde(flatten)]
    pub outcome: RedemptionOutcome,
}

/// Coupon redemption engine
pub struct CouponEngine {
    registry: Arc<RegistryStore>,
}

impl CouponEngine {
    pub fn new(registry: Arc<RegistryStore>) -> Self {
        Self { registry }
    }

    /// Redeem `code` for `tenant`
    pub async fn redeem(&self, code: &str, tenant: &TenantName) -> TenantResult<Redemption> {
        let now = Utc::now();
        let redemption = self
            .registry
            .redeem_atomically(code, tenant, |coupon, entry| apply(coupon, entry, now))
            .await?;

        info!(
            tenant = %tenant,
            code = %redemption.code,
            kind = redemption.kind.as_str(),
            outcome = redemption.outcome.as_str(),
            "coupon redeemed"
        );
        Ok(redemption)
    }
}

fn apply(coupon: &mut Coupon, entry: &mut RegistryEntry, now: DateTime<Utc>) -> TenantResult<Redemption> {
    if coupon.is_exhausted() {
        return Err(TenantError::CouponExhausted(coupon.code.clone()));
    }
    if coupon.is_redeemed_by(&entry.name) {
        return Err(TenantError::AlreadyRedeemed {
            code: coupon.code.clone(),
            tenant: entry.name.clone(),
        });
    }

    let outcome = match coupon.kind {
        CouponKind::TrialExtension => {
            let was_expired = entry.is_locked(now);
            let base = entry.trial_ends_at.filter(|end| *end > now).unwrap_or(now);
            let trial_ends_at = trial_end(base, coupon.value)?;
            entry.trial_ends_at = Some(trial_ends_at);

            let reactivated = was_expired && entry.status != TenantStatus::Free;
            if matches!(entry.status, TenantStatus::Expired | TenantStatus::Trialing) {
                entry.status = TenantStatus::Trialing;
            }
            RedemptionOutcome::TrialExtended {
                trial_ends_at,
                reactivated,
            }
        }
        CouponKind::FreeAccess => {
            entry.status = TenantStatus::Free;
            entry.trial_ends_at = None;
            RedemptionOutcome::FreeAccessGranted
        }
        CouponKind::Discount => {
            entry.discount_percent = Some(coupon.value);
            RedemptionOutcome::DiscountRecorded {
                percent: coupon.value,
            }
        }
    };

    coupon.redeemed_by.insert(entry.name.clone());
    coupon.redemption_count += 1;
    entry.coupons.push(coupon.code.clone());

    Ok(Redemption {
        code: coupon.code.clone(),
        kind: coupon.kind,
        outcome,
    })
}
