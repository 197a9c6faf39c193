use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::paths::home_dir;

pub const SMARTBERT_API_VAR: &str = "SMARTBERT_API";
pub const WEB3_SEKIT_API_VAR: &str = "WEB3_SEKIT_API";
pub const TOOLS_DIR_VAR: &str = "TOOLBRIDGE_TOOLS_DIR";
pub const SCANNER_DIR_VAR: &str = "TOOLBRIDGE_SCANNER_DIR";

pub const DEFAULT_SMARTBERT_URL: &str = "http://localhost:9900";
pub const DEFAULT_WEB3_SEKIT_URL: &str = "http://localhost:8081";

/// Directory name of the tools root below the home directory.
pub const TOOLS_DIR_NAME: &str = "tools";
/// Directory below the tools root that hosts the scanner binary.
pub const SCANNER_DIR_NAME: &str = "web3se-lab";
pub const SCANNER_BINARY_NAME: &str = "web3-scanner";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory unavailable; set HOME or {TOOLS_DIR_VAR}")]
    HomeUnavailable,

    #[error("Invalid endpoint for {var}: {value}")]
    InvalidEndpoint { var: &'static str, value: String },

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(&'static str),
}

/// Endpoints of the two auxiliary HTTP services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoints {
    pub smartbert: String,
    pub web3_sekit: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            smartbert: DEFAULT_SMARTBERT_URL.to_string(),
            web3_sekit: DEFAULT_WEB3_SEKIT_URL.to_string(),
        }
    }
}

/// Process-wide configuration, built once at startup and shared read-only.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeConfig {
    pub tools_root: PathBuf,
    pub scanner_dir: PathBuf,
    pub endpoints: ServiceEndpoints,
    pub command_timeout: Duration,
    pub scan_timeout: Duration,
    pub probe_timeout: Duration,
    pub launch_timeout: Duration,
    pub start_grace: Duration,
}

impl BridgeConfig {
    /// Configuration rooted at `tools_root` with every other value at its default.
    pub fn new(tools_root: impl Into<PathBuf>) -> Self {
        let tools_root = tools_root.into();
        Self {
            scanner_dir: tools_root.join(SCANNER_DIR_NAME),
            tools_root,
            endpoints: ServiceEndpoints::default(),
            command_timeout: Duration::from_secs(300),
            scan_timeout: Duration::from_secs(600),
            probe_timeout: Duration::from_secs(2),
            launch_timeout: Duration::from_secs(30),
            start_grace: Duration::from_secs(5),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), home_dir())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F, home: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let tools_root = match non_empty(TOOLS_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => home.ok_or(ConfigError::HomeUnavailable)?.join(TOOLS_DIR_NAME),
        };

        let mut config = Self::new(tools_root);
        if let Some(dir) = non_empty(SCANNER_DIR_VAR) {
            config.scanner_dir = PathBuf::from(dir);
        }
        if let Some(url) = non_empty(SMARTBERT_API_VAR) {
            config.endpoints.smartbert = url;
        }
        if let Some(url) = non_empty(WEB3_SEKIT_API_VAR) {
            config.endpoints.web3_sekit = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Re-roots the configuration; the scanner directory follows the new root.
    pub fn with_tools_root(mut self, tools_root: impl Into<PathBuf>) -> Self {
        self.tools_root = tools_root.into();
        self.scanner_dir = self.tools_root.join(SCANNER_DIR_NAME);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (var, value) in [
            (SMARTBERT_API_VAR, &self.endpoints.smartbert),
            (WEB3_SEKIT_API_VAR, &self.endpoints.web3_sekit),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidEndpoint {
                    var,
                    value: value.clone(),
                });
            }
        }

        if self.command_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("command_timeout"));
        }
        if self.scan_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("scan_timeout"));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("probe_timeout"));
        }

        Ok(())
    }

    pub fn scanner_binary(&self) -> PathBuf {
        self.scanner_dir.join(SCANNER_BINARY_NAME)
    }

    pub fn tool_dir(&self, subdir: &str) -> PathBuf {
        self.tools_root.join(subdir)
    }

    /// Directories prepended to `PATH` for every execution, in order.
    pub fn path_prefix(&self) -> [&Path; 2] {
        [self.tools_root.as_path(), self.scanner_dir.as_path()]
    }

    /// Fixed endpoint variables injected into every execution environment.
    pub fn endpoint_vars(&self) -> [(&'static str, &str); 2] {
        [
            (SMARTBERT_API_VAR, self.endpoints.smartbert.as_str()),
            (WEB3_SEKIT_API_VAR, self.endpoints.web3_sekit.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_home() {
        let config =
            BridgeConfig::from_lookup(lookup_from(&[]), Some(PathBuf::from("/home/a"))).unwrap();
        assert_eq!(config.tools_root, PathBuf::from("/home/a/tools"));
        assert_eq!(config.scanner_dir, PathBuf::from("/home/a/tools/web3se-lab"));
        assert_eq!(config.endpoints, ServiceEndpoints::default());
        assert_eq!(config.command_timeout, Duration::from_secs(300));
        assert_eq!(
            config.scanner_binary(),
            PathBuf::from("/home/a/tools/web3se-lab/web3-scanner")
        );
    }

    #[test]
    fn test_env_overrides() {
        let lookup = lookup_from(&[
            (TOOLS_DIR_VAR, "/opt/tools"),
            (SMARTBERT_API_VAR, "http://10.0.0.5:9900"),
            (WEB3_SEKIT_API_VAR, "https://sekit.internal"),
        ]);
        let config = BridgeConfig::from_lookup(lookup, None).unwrap();
        assert_eq!(config.tools_root, PathBuf::from("/opt/tools"));
        assert_eq!(config.scanner_dir, PathBuf::from("/opt/tools/web3se-lab"));
        assert_eq!(config.endpoints.smartbert, "http://10.0.0.5:9900");
        assert_eq!(config.endpoints.web3_sekit, "https://sekit.internal");
    }

    #[test]
    fn test_empty_override_falls_back() {
        let lookup = lookup_from(&[(SMARTBERT_API_VAR, "  ")]);
        let config = BridgeConfig::from_lookup(lookup, Some(PathBuf::from("/h"))).unwrap();
        assert_eq!(config.endpoints.smartbert, DEFAULT_SMARTBERT_URL);
    }

    #[test]
    fn test_missing_home_without_override() {
        let result = BridgeConfig::from_lookup(lookup_from(&[]), None);
        assert!(matches!(result, Err(ConfigError::HomeUnavailable)));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let lookup = lookup_from(&[(WEB3_SEKIT_API_VAR, "localhost:8081")]);
        let result = BridgeConfig::from_lookup(lookup, Some(PathBuf::from("/h")));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEndpoint { var: WEB3_SEKIT_API_VAR, .. })
        ));
    }

    #[test]
    fn test_with_tools_root_moves_scanner_dir() {
        let config = BridgeConfig::new("/a").with_tools_root("/b");
        assert_eq!(config.scanner_dir, PathBuf::from("/b/web3se-lab"));
        assert_eq!(config.tool_dir("slither"), PathBuf::from("/b/slither"));
    }
}
