//! Agent configuration.
//!
//! Everything has a default, so the agent runs without a config file. A TOML
//! file can override any field, and the email credentials can also come from
//! `EMAIL_ADDRESS` / `EMAIL_PASSWORD`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable holding the mailbox address.
pub const EMAIL_ADDRESS_ENV: &str = "EMAIL_ADDRESS";
/// Environment variable holding the mailbox (app) password.
pub const EMAIL_PASSWORD_ENV: &str = "EMAIL_PASSWORD";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// File manager settings.
    pub files: FilesConfig,
    /// Crypto tracker settings.
    pub crypto: CryptoConfig,
    /// Email settings.
    pub email: EmailConfig,
}

impl WorkspaceConfig {
    /// Load a config file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&raw)
    }

    /// Parse TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(address) = lookup(EMAIL_ADDRESS_ENV).filter(|v| !v.is_empty()) {
            self.email.address = Some(address);
        }
        if let Some(password) = lookup(EMAIL_PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.email.password = Some(password);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.files.max_read_bytes == 0 {
            return Err(Error::Config("files.max_read_bytes must be positive".into()));
        }
        if self.crypto.timeout_secs == 0 {
            return Err(Error::Config("crypto.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

/// File manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Roots the file tools may touch. Empty means unrestricted.
    pub allowed_roots: Vec<PathBuf>,
    /// Largest file `read_file` will return.
    pub max_read_bytes: u64,
    /// Extensions searched when the caller gives none.
    pub default_search_extensions: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            allowed_roots: Vec::new(),
            max_read_bytes: 1024 * 1024,
            default_search_extensions: ".txt,.py,.md,.json,.csv".into(),
        }
    }
}

/// Crypto tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// CoinGecko API base.
    pub api_base: String,
    /// Fear & Greed index endpoint.
    pub fear_greed_url: String,
    /// User-Agent sent upstream.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl CryptoConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.coingecko.com/api/v3".into(),
            fear_greed_url: "https://api.alternative.me/fng/".into(),
            user_agent: "crypto-tracker/1.0".into(),
            timeout_secs: 30,
        }
    }
}

/// Email settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// IMAP host.
    pub imap_server: String,
    /// IMAP TLS port.
    pub imap_port: u16,
    /// SMTP host.
    pub smtp_server: String,
    /// SMTP submission (STARTTLS) port.
    pub smtp_port: u16,
    /// Mailbox address, also used as the sender.
    pub address: Option<String>,
    /// Mailbox password.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl EmailConfig {
    /// Address and password, if both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.address.as_deref(), self.password.as_deref()) {
            (Some(a), Some(p)) if !a.is_empty() && !p.is_empty() => Some((a, p)),
            _ => None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            imap_server: "imap.gmail.com".into(),
            imap_port: 993,
            smtp_server: "smtp.gmail.com".into(),
            smtp_port: 587,
            address: None,
            password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.files.max_read_bytes, 1024 * 1024);
        assert_eq!(config.email.imap_port, 993);
        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.crypto.timeout(), Duration::from_secs(30));
        assert!(config.email.credentials().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorkspaceConfig::from_toml(
            r#"
            [files]
            allowed_roots = ["/home/me"]

            [email]
            imap_server = "imap.example.org"
            "#,
        )
        .unwrap();
        assert_eq!(config.files.allowed_roots, vec![PathBuf::from("/home/me")]);
        assert_eq!(config.files.max_read_bytes, 1024 * 1024);
        assert_eq!(config.email.imap_server, "imap.example.org");
        assert_eq!(config.email.smtp_server, "smtp.gmail.com");
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = WorkspaceConfig::from_toml("[crypto]\ntimeout_secs = 0").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = WorkspaceConfig::default();
        config.apply_env(|key| match key {
            EMAIL_ADDRESS_ENV => Some("me@example.org".into()),
            EMAIL_PASSWORD_ENV => Some("app-password".into()),
            _ => None,
        });
        assert_eq!(
            config.email.credentials(),
            Some(("me@example.org", "app-password"))
        );
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = WorkspaceConfig::default();
        config.email.address = Some("kept@example.org".into());
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config.email.address.as_deref(), Some("kept@example.org"));
    }
}
