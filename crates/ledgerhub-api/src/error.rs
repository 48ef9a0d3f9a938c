//! API error mapping

use crate::models::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledgerhub_tenant::{StoreError, TenantError};
use thiserror::Error;
use tracing::error;

/// Error returned by handlers and middleware
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Tenant dataset read/write failed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Tenant(e) => tenant_status(e),
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Tenant(e) => e.code(),
            Self::Store(_) => "storage_unavailable",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
        }
    }
}

fn tenant_status(e: &TenantError) -> StatusCode {
    match e {
        TenantError::InvalidTenantName { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TenantError::TenantNameTaken(_) => StatusCode::CONFLICT,
        TenantError::TenantNotRegistered(_) | TenantError::NoTenant => StatusCode::NOT_FOUND,
        TenantError::ContextNotEstablished | TenantError::TrialOutOfRange { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        TenantError::CrossTenantSession { .. } | TenantError::NotAuthenticated => {
            StatusCode::UNAUTHORIZED
        }
        TenantError::TrialExpired { .. } => StatusCode::PAYMENT_REQUIRED,
        TenantError::CouponNotFound(_) => StatusCode::NOT_FOUND,
        TenantError::CouponExhausted(_) => StatusCode::GONE,
        TenantError::AlreadyRedeemed { .. } => StatusCode::CONFLICT,
        TenantError::StoreInitializationFailed { .. } | TenantError::RegistryUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            Self::Tenant(e) if e.is_transient() => {
                error!(code = e.code(), error = %e, "infrastructure failure");
                "Service temporarily unavailable, please retry".to_string()
            }
            Self::Tenant(e) if e.is_auth_failure() => "Authentication required".to_string(),
            Self::Tenant(TenantError::ContextNotEstablished) => {
                error!("tenant context missing, middleware order is wrong");
                "Internal server error".to_string()
            }
            Self::Tenant(e @ TenantError::TrialOutOfRange { .. }) => {
                error!(error = %e, "misconfigured trial length");
                "Internal server error".to_string()
            }
            Self::Tenant(TenantError::TrialExpired { .. }) => {
                "Your trial has expired. Upgrade to continue making changes.".to_string()
            }
            Self::Store(e) => {
                error!(error = %e, "tenant storage failure");
                "Service temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        };

        let mut body = ApiResponse::<()>::error(self.code(), &message);
        if let (Self::Tenant(TenantError::TrialExpired { allowed_paths, .. }), Some(error)) =
            (&self, body.error.as_mut())
        {
            error.allowed_paths = Some(allowed_paths.clone());
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerhub_tenant::TenantName;

    #[test]
    fn test_status_mapping() {
        let acme = TenantName::parse("acme").unwrap();
        let cases = [
            (ApiError::from(TenantName::parse("API").unwrap_err()), 422),
            (TenantError::TenantNameTaken(acme.clone()).into(), 409),
            (TenantError::NoTenant.into(), 404),
            (TenantError::NotAuthenticated.into(), 401),
            (
                TenantError::TrialExpired { tenant: acme.clone(), allowed_paths: vec![] }.into(),
                402,
            ),
            (TenantError::CouponExhausted("X".into()).into(), 410),
            (TenantError::RegistryUnavailable("closed".into()).into(), 503),
            (TenantError::ContextNotEstablished.into(), 500),
            (TenantError::TrialOutOfRange { days: u32::MAX }.into(), 500),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status().as_u16(), expected, "{error}");
        }
    }
}
