//! Configuration management for the GeoGebra MCP Server
//!
//! Handles defaults, the optional config file, and environment variables.
//! Precedence, lowest first: defaults, `~/.geogebra-mcp/config.json`,
//! environment, command-line flags (applied by the binary).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, GeoGebraMcpError, Result};

/// Default address of the GeoGebra bridge process
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8765";

/// Default per-request timeout against the bridge
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the GeoGebra MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the optional config file
    pub config_dir: Option<PathBuf>,

    /// Base URL of the GeoGebra bridge
    pub bridge_url: String,

    /// Timeout applied to each bridge request
    pub request_timeout: Duration,
}

/// Shape of `config.json`; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    bridge_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl Config {
    /// Create a configuration from defaults, the config file and the environment.
    ///
    /// Not validated yet: callers apply their own overrides, then call
    /// [`Config::validate`] once.
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir();

        let mut config = Self {
            config_dir: config_dir.clone(),
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        if let Some(dir) = config_dir {
            let path = dir.join("config.json");
            if path.exists() {
                config.apply_file(&path)?;
            }
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Get the configuration directory (`~/.geogebra-mcp`), if a home directory exists
    fn get_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".geogebra-mcp"))
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let file: FileConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ReadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if let Some(url) = file.bridge_url {
            self.bridge_url = url;
        }
        if let Some(secs) = file.timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("GEOGEBRA_BRIDGE_URL") {
            self.bridge_url = url;
        }

        if let Ok(raw) = std::env::var("GEOGEBRA_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                GeoGebraMcpError::Config(ConfigError::InvalidEnvVar {
                    var: "GEOGEBRA_TIMEOUT_SECS".to_string(),
                    message: format!("expected a whole number of seconds, got '{}'", raw),
                })
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }

        Ok(())
    }

    /// Override the bridge URL (used for CLI flags)
    pub fn with_bridge_url(mut self, url: impl Into<String>) -> Self {
        self.bridge_url = url.into();
        self
    }

    /// Override the request timeout (used for CLI flags)
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs);
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        let url = self.bridge_url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "bridge URL must not be empty".to_string(),
            }
            .into());
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidConfig {
                message: format!("bridge URL must use http or https: {}", url),
            }
            .into());
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig {
                message: "request timeout must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Server identity and protocol constants
pub mod server {
    /// Name reported in `serverInfo`
    pub const NAME: &str = "geogebra-mcp";

    /// Version reported in `serverInfo`
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            config_dir: None,
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_url() {
        let config = base_config().with_bridge_url("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = base_config().with_bridge_url("ftp://localhost");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = base_config().with_timeout_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_env_url_can_be_overridden() {
        std::env::set_var("GEOGEBRA_BRIDGE_URL", "not-a-url");
        let loaded = Config::new();
        std::env::remove_var("GEOGEBRA_BRIDGE_URL");

        let config = loaded.unwrap();
        assert_eq!(config.bridge_url, "not-a-url");
        assert!(config.validate().is_err());

        let config = config.with_bridge_url("http://127.0.0.1:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_config_overrides() {
        let dir = std::env::temp_dir().join(format!("geogebra-mcp-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"bridgeUrl": "http://10.0.0.2:9000", "timeoutSecs": 5}"#)
            .unwrap();

        let mut config = base_config();
        config.apply_file(&path).unwrap();
        assert_eq!(config.bridge_url, "http://10.0.0.2:9000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        std::fs::remove_dir_all(&dir).ok();
    }
}
