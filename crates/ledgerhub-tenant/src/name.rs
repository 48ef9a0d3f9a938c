//! Tenant names
//!
//! A tenant name is the subdomain a tenant is served from and the only key
//! into both the registry and the store pool.

use crate::error::{NameRejection, TenantError, TenantResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a DNS label
pub const MAX_NAME_LEN: usize = 63;

/// Names that can never be registered or resolved as tenants
pub const RESERVED_NAMES: &[&str] = &[
    "admin", "api", "app", "assets", "auth", "billing", "blog", "cdn", "dashboard", "dev",
    "docs", "ftp", "help", "imap", "login", "logout", "mail", "media", "pop", "root",
    "settings", "signup", "smtp", "staging", "static", "status", "support", "system", "test",
    "www",
];

/// Validated tenant name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantName(String);

impl TenantName {
    /// Normalize (trim, ASCII-lowercase) and validate a raw name
    pub fn parse(raw: &str) -> TenantResult<Self> {
        let name = raw.trim().to_ascii_lowercase();
        validate(&name).map_err(|reason| TenantError::InvalidTenantName {
            name: raw.to_string(),
            reason,
        })?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> Result<(), NameRejection> {
    if name.is_empty() {
        return Err(NameRejection::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(NameRejection::TooLong);
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(NameRejection::InvalidCharacter(c));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(NameRejection::HyphenBoundary);
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(NameRejection::Reserved);
    }
    Ok(())
}

impl fmt::Display for TenantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantName {
    type Error = TenantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantName> for String {
    fn from(name: TenantName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rejection(raw: &str) -> NameRejection {
        match TenantName::parse(raw) {
            Err(TenantError::InvalidTenantName { reason, .. }) => reason,
            other => panic!("expected rejection for {raw:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_names() {
        assert_eq!(TenantName::parse("acme").unwrap().as_str(), "acme");
        assert_eq!(TenantName::parse("acme-corp-2").unwrap().as_str(), "acme-corp-2");
        assert_eq!(TenantName::parse("  Acme ").unwrap().as_str(), "acme");
        assert_eq!(TenantName::parse("7").unwrap().as_str(), "7");
    }

    #[test]
    fn test_mixed_case_reserved_name() {
        assert_eq!(rejection("API"), NameRejection::Reserved);
        assert_eq!(rejection("Www"), NameRejection::Reserved);
    }

    #[test]
    fn test_rejections() {
        assert_eq!(rejection(""), NameRejection::Empty);
        assert_eq!(rejection("   "), NameRejection::Empty);
        assert_eq!(rejection(&"a".repeat(64)), NameRejection::TooLong);
        assert_eq!(rejection("acme_corp"), NameRejection::InvalidCharacter('_'));
        assert_eq!(rejection("acme.corp"), NameRejection::InvalidCharacter('.'));
        assert_eq!(rejection("café"), NameRejection::InvalidCharacter('é'));
        assert_eq!(rejection("-acme"), NameRejection::HyphenBoundary);
        assert_eq!(rejection("acme-"), NameRejection::HyphenBoundary);
    }

    #[test]
    fn test_max_length_accepted() {
        assert!(TenantName::parse(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_serde_validates() {
        let name: TenantName = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(name.as_str(), "acme");
        assert!(serde_json::from_str::<TenantName>("\"admin\"").is_err());
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"acme\"");
    }

    proptest! {
        #[test]
        fn prop_well_formed_labels_parse(name in "[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?") {
            prop_assume!(!RESERVED_NAMES.contains(&name.as_str()));
            let parsed = TenantName::parse(&name).unwrap();
            prop_assert_eq!(parsed.as_str(), name.as_str());
        }

        #[test]
        fn prop_parsed_names_are_canonical(raw in "\\PC{0,80}") {
            if let Ok(name) = TenantName::parse(&raw) {
                prop_assert!(name.as_str().len() <= MAX_NAME_LEN);
                prop_assert!(!name.as_str().starts_with('-'));
                prop_assert!(!name.as_str().ends_with('-'));
                prop_assert!(name.as_str().chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
                prop_assert_eq!(TenantName::parse(name.as_str()).unwrap(), name.clone());
            }
        }
    }
}
