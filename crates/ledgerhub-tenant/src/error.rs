//! Error types for the tenancy layer

use crate::name::TenantName;
use thiserror::Error;

/// Tenancy error type
#[derive(Debug, Error)]
pub enum TenantError {
    /// Name failed validation (charset, length, hyphens, reserved)
    #[error("invalid tenant name {name:?}: {reason}")]
    InvalidTenantName { name: String, reason: NameRejection },

    /// Name already registered
    #[error("tenant name already taken: {0}")]
    TenantNameTaken(TenantName),

    /// Operation needs a registry entry the tenant does not have
    #[error("tenant not registered: {0}")]
    TenantNotRegistered(TenantName),

    /// Request resolved to no tenant but the operation needs one
    #[error("no tenant for this request")]
    NoTenant,

    /// Guard or gate ran before the resolver established the request context
    #[error("tenant context not established for this request")]
    ContextNotEstablished,

    /// Tenant store could not be opened or created
    #[error("store initialization failed for {tenant}: {reason}")]
    StoreInitializationFailed { tenant: TenantName, reason: String },

    /// Session issued under one tenant replayed against another
    #[error("session belongs to tenant {session_tenant}, request is for {request_tenant}")]
    CrossTenantSession {
        session_tenant: TenantName,
        request_tenant: TenantName,
    },

    /// No authenticated session
    #[error("not authenticated")]
    NotAuthenticated,

    /// Trial expired, only the allow-listed paths accept writes
    #[error("trial expired for {tenant}")]
    TrialExpired {
        tenant: TenantName,
        allowed_paths: Vec<String>,
    },

    /// Unknown coupon code
    #[error("coupon not found: {0}")]
    CouponNotFound(String),

    /// Coupon reached its redemption limit
    #[error("coupon exhausted: {0}")]
    CouponExhausted(String),

    /// Coupon already redeemed by this tenant
    #[error("coupon {code} already redeemed by {tenant}")]
    AlreadyRedeemed { code: String, tenant: TenantName },

    /// Registry backend failed or was closed
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Trial length pushes the trial end past the representable date range
    #[error("trial period of {days} days is out of range")]
    TrialOutOfRange { days: u32 },
}

impl TenantError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTenantName { .. } => "invalid_tenant_name",
            Self::TenantNameTaken(_) => "tenant_name_taken",
            Self::TenantNotRegistered(_) => "tenant_not_registered",
            Self::NoTenant => "no_tenant",
            Self::ContextNotEstablished => "context_not_established",
            Self::StoreInitializationFailed { .. } => "store_initialization_failed",
            Self::CrossTenantSession { .. } => "cross_tenant_session",
            Self::NotAuthenticated => "not_authenticated",
            Self::TrialExpired { .. } => "trial_expired",
            Self::CouponNotFound(_) => "coupon_not_found",
            Self::CouponExhausted(_) => "coupon_exhausted",
            Self::AlreadyRedeemed { .. } => "already_redeemed",
            Self::RegistryUnavailable(_) => "registry_unavailable",
            Self::TrialOutOfRange { .. } => "trial_out_of_range",
        }
    }

    /// Infrastructure failures that may succeed on the next request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreInitializationFailed { .. } | Self::RegistryUnavailable(_)
        )
    }

    /// Errors the boundary must report as an authentication failure
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::CrossTenantSession { .. } | Self::NotAuthenticated)
    }

    /// Coupon errors are reported verbatim to the redeeming user
    pub fn is_coupon_error(&self) -> bool {
        matches!(
            self,
            Self::CouponNotFound(_) | Self::CouponExhausted(_) | Self::AlreadyRedeemed { .. }
        )
    }
}

/// Why a tenant name was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameRejection {
    #[error("name is empty")]
    Empty,
    #[error("name is longer than {} characters", crate::name::MAX_NAME_LEN)]
    TooLong,
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("name may not start or end with a hyphen")]
    HyphenBoundary,
    #[error("name is reserved")]
    Reserved,
}

/// Storage engine failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// No backing storage exists for the tenant
    #[error("no storage for tenant {0}")]
    Missing(TenantName),

    /// Backing storage exists but cannot be read
    #[error("storage for tenant {tenant} is corrupt: {reason}")]
    Corrupt { tenant: TenantName, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the tenancy layer
pub type TenantResult<T> = Result<T, TenantError>;
