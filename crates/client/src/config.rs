//! Client configuration

use airshipui_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the airshipUI backend
    pub endpoint: String,

    /// Where the session token is cached between runs
    pub token_store_path: PathBuf,

    /// Transport configuration
    pub transport: TransportConfig,

    /// Reconnect backoff configuration
    pub backoff: BackoffConfig,

    /// Authentication guard configuration
    pub auth: AuthConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:10443/ws".to_string(),
            token_store_path: airshipui_common::default_token_path(),
            transport: TransportConfig::default(),
            backoff: BackoffConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Interval between keep-alive envelopes
    pub keepalive_secs: u64,

    /// Upper bound for opening the socket
    pub connect_timeout_ms: u64,

    /// Upper bound for the initialize reply
    pub handshake_timeout_ms: u64,

    /// Consecutive failed connects before the operator is warned
    pub notify_after_failures: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            keepalive_secs: 60,
            connect_timeout_ms: 10_000,
            handshake_timeout_ms: 10_000,
            notify_after_failures: 5,
        }
    }
}

impl TransportConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Reconnect backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    /// Fraction of each delay randomised, 0.0 to 1.0
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            max_ms: 30_000,
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

/// Authentication guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime given to an approved token
    pub token_ttl_secs: i64,

    /// Route of the login view
    pub login_route: String,

    /// Route shown after login
    pub home_route: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 3600,
            login_route: "/login".to_string(),
            home_route: "/".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the transport cannot work with
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| Error::InvalidConfig(format!("endpoint {}: {}", self.endpoint, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::InvalidConfig(format!(
                "endpoint scheme must be ws or wss, got {}",
                url.scheme()
            )));
        }
        if self.transport.keepalive_secs == 0 {
            return Err(Error::InvalidConfig("keepalive_secs must be positive".to_string()));
        }
        if self.backoff.multiplier < 1.0 {
            return Err(Error::InvalidConfig("backoff multiplier must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter) {
            return Err(Error::InvalidConfig("backoff jitter must be within 0..=1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.transport.keepalive_secs, 60);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.auth.login_route, "/login");
    }

    #[test]
    fn test_partial_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "endpoint = \"wss://console.example:443/ws\"\n[transport]\nkeepalive_secs = 15\n",
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.endpoint, "wss://console.example:443/ws");
        assert_eq!(config.transport.keepalive_secs, 15);
        assert_eq!(config.transport.notify_after_failures, 5);

        let saved = dir.path().join("nested/saved.toml");
        config.save(&saved).unwrap();
        let reloaded = ClientConfig::load(&saved).unwrap();
        assert_eq!(reloaded.transport.keepalive_secs, 15);
    }

    #[test]
    fn test_validation() {
        let mut config = ClientConfig::default();
        assert!(config.validate().is_ok());

        config.endpoint = "http://localhost:10443/ws".to_string();
        assert!(config.validate().is_err());

        config = ClientConfig::default();
        config.backoff.jitter = 1.5;
        assert!(config.validate().is_err());
    }
}
