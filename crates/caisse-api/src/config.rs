//! # Client Configuration
//!
//! Where the backend lives, how long to wait for it, how hard to retry,
//! and who this terminal is.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAISSE_SERVER_URL=https://pos.example.com                          │
//! │     CAISSE_DEVICE_ID=tab-01                                            │
//! │     CAISSE_MODULE=pharmacie                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/caisse-pos/caisse.toml (Linux)                           │
//! │     ~/Library/Application Support/com.caisse.pos/caisse.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://localhost:8080, auto-generated device id, boutique          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! base_url = "https://pos.example.com"
//! timeout_secs = 15
//!
//! [retry]
//! max_retries = 3
//! initial_backoff_ms = 300
//!
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Tablette comptoir"
//! default_module = "depot"
//! ```

use caisse_core::ModuleActif;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Server Settings
// =============================================================================

/// Backend location and HTTP timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL of the backend, `/api/...` paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Seconds before token expiry at which the session is renewed.
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_refresh_margin() -> u64 {
    60
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            refresh_margin_secs: default_refresh_margin(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Exponential backoff for retryable failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries after the first attempt. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    300
}

fn default_max_backoff() -> u64 {
    5_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity of this terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier, printed on ventes.
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable name ("Tablette comptoir").
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Module the terminal starts in after login.
    #[serde(default)]
    pub default_module: ModuleActif,
}

fn default_device_name() -> String {
    "Caisse mobile".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
            default_module: ModuleActif::default(),
        }
    }
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub device: DeviceConfig,
}

impl ClientConfig {
    /// Creates a config with defaults pointing at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.server.base_url = base_url.into();
        config
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (caisse.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(ClientError::InvalidConfig("device id must not be empty".into()));
        }

        let url = Url::parse(&self.server.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "Server URL must start with http:// or https://, got: {}",
                self.server.base_url
            )));
        }
        if url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(self.server.base_url.clone()));
        }

        if self.server.timeout_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `CAISSE_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CAISSE_SERVER_URL") {
            debug!(url = %url, "Overriding server URL from environment");
            self.server.base_url = url;
        }

        if let Some(secs) = lookup("CAISSE_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.server.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Invalid CAISSE_TIMEOUT_SECS"),
            }
        }

        if let Some(retries) = lookup("CAISSE_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(r) => self.retry.max_retries = r,
                Err(_) => warn!(value = %retries, "Invalid CAISSE_MAX_RETRIES"),
            }
        }

        if let Some(id) = lookup("CAISSE_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Some(name) = lookup("CAISSE_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Some(module) = lookup("CAISSE_MODULE") {
            match module.parse::<ModuleActif>() {
                Ok(m) => {
                    debug!(module = %m, "Overriding default module from environment");
                    self.device.default_module = m;
                }
                Err(_) => warn!(module = %module, "Unknown module in environment"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "caisse", "pos")
            .map(|dirs| dirs.config_dir().join("caisse.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Parsed base URL. Call after [`validate`](Self::validate).
    pub fn base_url(&self) -> ClientResult<Url> {
        Ok(Url::parse(&self.server.base_url)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.server.connect_timeout_secs)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.server.refresh_margin_secs)
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(!config.device.id.is_empty());
        assert_eq!(config.device.default_module, ModuleActif::Boutique);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.device.id = String::new();
        assert!(config.validate().is_err());

        config.device.id = "tab-01".to_string();
        config.server.base_url = "ftp://pos.example.com".to_string();
        assert!(matches!(config.validate(), Err(ClientError::InvalidUrl(_))));

        config.server.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.server.base_url = "https://pos.example.com/caisse".to_string();
        assert!(config.validate().is_ok());

        config.server.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("CAISSE_SERVER_URL", "https://pos.example.com"),
            ("CAISSE_DEVICE_ID", "tab-07"),
            ("CAISSE_MODULE", "resto"),
            ("CAISSE_MAX_RETRIES", "not-a-number"),
            ("CAISSE_TIMEOUT_SECS", "30"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.base_url, "https://pos.example.com");
        assert_eq!(config.device.id, "tab-07");
        assert_eq!(config.device.default_module, ModuleActif::Restaurant);
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [server]
            base_url = "https://pos.example.com"

            [device]
            id = "tab-01"
            default_module = "depot"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.timeout_secs, 15);
        assert_eq!(config.device.name, "Caisse mobile");
        assert_eq!(config.device.default_module, ModuleActif::Depot);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("caisse-test-{}", Uuid::new_v4()))
            .join("caisse.toml");

        let mut config = ClientConfig::with_base_url("https://pos.example.com");
        config.device.id = "tab-42".to_string();
        config.save(Some(path.clone())).unwrap();

        let loaded = ClientConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.server.base_url, "https://pos.example.com");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
