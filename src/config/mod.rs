//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable holding the configuration file path
pub const CONFIG_ENV: &str = "USERADMIN_CONFIG";

/// Complete configuration for the admin server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Externally visible base URL, used for `href` and pagination links
    pub public_url: String,

    /// Prefix the resource routes are additionally mounted under
    pub api_prefix: String,

    /// Page size when a request does not send `size`
    pub default_page_size: usize,

    /// Upper bound for `size`
    pub max_page_size: usize,

    /// Name given to the root role when it is first created
    pub root_role: String,

    /// Role to mark as default at startup
    pub default_role: Option<String>,

    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
            public_url: "http://localhost:9000".to_string(),
            api_prefix: "/api".to_string(),
            default_page_size: 30,
            max_page_size: 100,
            root_role: "root".to_string(),
            default_role: None,
            log_filter: "info".to_string(),
        }
    }
}

impl AdminConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AdminConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `USERADMIN_CONFIG`, or use defaults
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Address to bind, `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The API prefix normalized to `/segment` form, `None` when empty
    pub fn normalized_prefix(&self) -> Option<String> {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(format!("/{}", trimmed))
        }
    }

    /// Parsed public URL
    pub fn public_url(&self) -> Result<Url> {
        Url::parse(&self.public_url)
            .with_context(|| format!("invalid public_url '{}'", self.public_url))
    }

    /// Absolute base of resource links, e.g. `http://localhost:9000/api`
    pub fn href_base(&self) -> String {
        format!(
            "{}{}",
            self.public_url.trim_end_matches('/'),
            self.normalized_prefix().unwrap_or_default()
        )
    }

    fn validate(&self) -> Result<()> {
        self.public_url()?;
        if self.default_page_size == 0 || self.max_page_size == 0 {
            anyhow::bail!("page sizes must be positive");
        }
        if self.root_role.trim().is_empty() {
            anyhow::bail!("root_role must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.href_base(), "http://localhost:9000/api");
        assert_eq!(config.default_page_size, 30);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.root_role, "root");
        assert!(config.default_role.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AdminConfig::from_yaml_str(
            r#"
port: 8080
public_url: "https://admin.example.com/"
default_role: member
"#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.default_role.as_deref(), Some("member"));
        assert_eq!(config.href_base(), "https://admin.example.com/api");
    }

    #[test]
    fn test_prefix_normalization() {
        let mut config = AdminConfig::default();
        config.api_prefix = "v1/".to_string();
        assert_eq!(config.normalized_prefix().as_deref(), Some("/v1"));
        config.api_prefix = "/".to_string();
        assert_eq!(config.normalized_prefix(), None);
        assert_eq!(config.href_base(), "http://localhost:9000");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(AdminConfig::from_yaml_str("public_url: not a url").is_err());
        assert!(AdminConfig::from_yaml_str("max_page_size: 0").is_err());
        assert!(AdminConfig::from_yaml_str("port: [1, 2]").is_err());
    }
}
