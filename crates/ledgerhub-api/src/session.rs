//! Session tokens
//!
//! Sessions travel as HS256 JWTs in `Authorization: Bearer`. Expiry is
//! checked here rather than by the JWT library so an expired token still
//! yields its tenant, and the cross-tenant check keeps applying to it.
//!
//! This server only verifies sessions. Sign-in (credential checks, password
//! hashing) belongs to the identity service, which shares `session_secret`
//! and mints tokens with [`SessionCodec::issue`] under the tenant the user
//! signed in to.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ledgerhub_tenant::{Session, TenantName};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    /// Tenant the session was issued under
    pub tenant: Option<String>,
    #[serde(default)]
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issues and decodes session tokens
#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionCodec {
    pub fn new(secret: &str, ttl_hours: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(i64::from(ttl_hours)),
        }
    }

    /// Issue a token for `user_id` under `tenant`
    pub fn issue(
        &self,
        user_id: &str,
        tenant: Option<&TenantName>,
        admin: bool,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            tenant: tenant.map(|t| t.to_string()),
            admin,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Decode a bearer token into a session.
    ///
    /// Bad signatures and malformed tokens give an anonymous session; an
    /// expired token gives an unauthenticated session that keeps its tenant.
    pub fn decode(&self, token: &str) -> Session {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "rejected session token");
                return Session::anonymous();
            }
        };

        // A tenant claim that no longer parses cannot match any request
        let tenant = match claims.tenant.as_deref().map(TenantName::parse) {
            Some(Ok(tenant)) => Some(tenant),
            Some(Err(_)) => return Session::anonymous(),
            None => None,
        };

        Session {
            authenticated: claims.exp > Utc::now().timestamp(),
            tenant,
            user_id: Some(claims.sub),
            is_admin: claims.admin,
        }
    }

    /// Session carried by an `Authorization` header value
    pub fn from_header(&self, header: Option<&str>) -> Session {
        match header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => self.decode(token.trim()),
            None => Session::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> TenantName {
        TenantName::parse("acme").unwrap()
    }

    #[test]
    fn test_issue_and_decode() {
        let codec = SessionCodec::new("secret", 24);
        let token = codec.issue("user-1", Some(&acme()), true).unwrap();

        let session = codec.from_header(Some(&format!("Bearer {token}")));
        assert!(session.authenticated);
        assert_eq!(session.tenant, Some(acme()));
        assert_eq!(session.user_id.as_deref(), Some("user-1"));
        assert!(session.is_admin);
    }

    #[test]
    fn test_expired_token_keeps_tenant() {
        let codec = SessionCodec::new("secret", 0);
        let token = codec.issue("user-1", Some(&acme()), false).unwrap();

        let session = codec.decode(&token);
        assert!(!session.authenticated);
        assert_eq!(session.tenant, Some(acme()));
    }

    #[test]
    fn test_foreign_signature_is_anonymous() {
        let token = SessionCodec::new("other", 24)
            .issue("user-1", Some(&acme()), false)
            .unwrap();

        let session = SessionCodec::new("secret", 24).decode(&token);
        assert_eq!(session, Session::anonymous());
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let codec = SessionCodec::new("secret", 24);
        assert_eq!(codec.from_header(None), Session::anonymous());
        assert_eq!(codec.from_header(Some("Basic abc")), Session::anonymous());
        assert_eq!(codec.from_header(Some("Bearer not.a.jwt")), Session::anonymous());
    }
}
