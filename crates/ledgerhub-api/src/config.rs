//! Server Configuration

use ledgerhub_tenant::TenancyConfig;
use serde::{Deserialize, Serialize};

/// Default config location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ledgerhub/server.json";

/// Environment variable overriding the session signing secret
pub const SESSION_SECRET_ENV: &str = "LEDGERHUB_SESSION_SECRET";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// HS256 key for session tokens
    pub session_secret: String,
    /// Session lifetime
    pub session_ttl_hours: u32,
    pub tenancy: TenancyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
            session_secret: "change-me".into(),
            session_ttl_hours: 24,
            tenancy: TenancyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from file
    pub fn load(path: &str) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Load from `CONFIG_PATH`, falling back to defaults, then apply
    /// environment overrides
    pub fn from_env() -> Self {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        let mut config = Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path, error = %e, "Config not found, using defaults");
            Self::default()
        });
        if let Ok(secret) = std::env::var(SESSION_SECRET_ENV) {
            config.session_secret = secret;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerhub_tenant::Deployment;

    #[test]
    fn test_nested_tenancy_config() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"bind": "127.0.0.1:3000", "tenancy": {"base_domain": "ledgerhub.app", "deployment": "self_hosted"}}"#,
        )
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.tenancy.base_domain, "ledgerhub.app");
        assert_eq!(config.tenancy.deployment, Deployment::SelfHosted);
        assert_eq!(config.tenancy.trial_days, 14);
    }
}
