//! Request tenant resolution from the request host

use crate::name::TenantName;
use tracing::debug;

/// Maps request hosts to tenant names under a base domain
#[derive(Debug, Clone)]
pub struct TenantResolver {
    base_domain: String,
}

impl TenantResolver {
    pub fn new(base_domain: &str) -> Self {
        Self {
            base_domain: base_domain
                .trim()
                .trim_start_matches('.')
                .trim_end_matches('.')
                .to_ascii_lowercase(),
        }
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Resolve a `Host` value to a tenant.
    ///
    /// Returns `None` for the apex domain, nested subdomains, foreign
    /// domains, IP literals and labels that are not valid tenant names.
    pub fn resolve(&self, host: &str) -> Option<TenantName> {
        let host = strip_port(host.trim())?.trim_end_matches('.').to_ascii_lowercase();

        let label = host
            .strip_suffix(self.base_domain.as_str())?
            .strip_suffix('.')?;
        if label.is_empty() || label.contains('.') {
            return None;
        }

        match TenantName::parse(label) {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(host = %host, error = %e, "subdomain is not a tenant");
                None
            }
        }
    }
}

fn strip_port(host: &str) -> Option<&str> {
    if host.starts_with('[') {
        // IPv6 literal
        return None;
    }
    Some(match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    })
}
