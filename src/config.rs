//! Configuration management for vpnsession

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{VpnError, VpnResult};
use crate::validation;

/// Longest accepted discovery cache lifetime, 100 years
pub const MAX_DISCOVERY_CACHE_TTL_SECS: i64 = 100 * 365 * 24 * 3600;

/// Main vpnsession configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Storage paths
    #[serde(default)]
    pub paths: ConfigPaths,
    /// Default settings
    #[serde(default)]
    pub defaults: DefaultSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPaths {
    /// Directory holding the persisted preference documents
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// How long discovery results stay valid (seconds)
    #[serde(default = "default_discovery_cache_ttl")]
    pub discovery_cache_ttl_secs: i64,
    /// Interval between connection info updates (milliseconds)
    #[serde(default = "default_status_update_interval")]
    pub status_update_interval_ms: u64,
    /// Name of the tunnel interface
    #[serde(default = "default_vpn_interface_name")]
    pub vpn_interface_name: String,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/vpnsession")
}

fn default_discovery_cache_ttl() -> i64 {
    86400
}

fn default_status_update_interval() -> u64 {
    1000
}

fn default_vpn_interface_name() -> String {
    "tun0".to_string()
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            discovery_cache_ttl_secs: default_discovery_cache_ttl(),
            status_update_interval_ms: default_status_update_interval(),
            vpn_interface_name: default_vpn_interface_name(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            paths: ConfigPaths::default(),
            defaults: DefaultSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> VpnResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| VpnError::Config(format!("Failed to read config: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| VpnError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> VpnResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VpnError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| VpnError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Ensure all directories exist
    pub fn ensure_directories(&self) -> VpnResult<()> {
        let dir = &self.paths.state_dir;
        std::fs::create_dir_all(dir)
            .map_err(|e| VpnError::Config(format!("Failed to create directory {:?}: {}", dir, e)))?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> VpnResult<()> {
        let ttl = self.defaults.discovery_cache_ttl_secs;
        if !(0..=MAX_DISCOVERY_CACHE_TTL_SECS).contains(&ttl) {
            return Err(VpnError::Config(format!(
                "discovery_cache_ttl_secs must be between 0 and {}",
                MAX_DISCOVERY_CACHE_TTL_SECS
            )));
        }
        if self.defaults.status_update_interval_ms == 0 {
            return Err(VpnError::Config("status_update_interval_ms must be positive".to_string()));
        }
        validation::validate_interface_name(&self.defaults.vpn_interface_name)
            .map_err(|e| VpnError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn status_update_interval(&self) -> Duration {
        Duration::from_millis(self.defaults.status_update_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.defaults.discovery_cache_ttl_secs, 86400);
        assert_eq!(config.status_update_interval(), Duration::from_secs(1));
        assert_eq!(config.defaults.vpn_interface_name, "tun0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vpnsession.toml");
        std::fs::write(&path, "[defaults]\nvpn_interface_name = \"tun1\"\n").unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.defaults.vpn_interface_name, "tun1");
        assert_eq!(config.defaults.status_update_interval_ms, 1000);
        assert_eq!(config.paths, ConfigPaths::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vpnsession.toml");
        let mut config = SessionConfig::default();
        config.paths.state_dir = dir.path().join("state");
        config.defaults.discovery_cache_ttl_secs = 60;

        config.save(&path).unwrap();
        assert_eq!(SessionConfig::load(&path).unwrap(), config);

        config.ensure_directories().unwrap();
        assert!(dir.path().join("state").is_dir());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vpnsession.toml");
        std::fs::write(&path, "[defaults]\nstatus_update_interval_ms = 0\n").unwrap();
        assert!(matches!(SessionConfig::load(&path), Err(VpnError::Config(_))));
    }

    #[test]
    fn test_cache_ttl_bounds() {
        let mut config = SessionConfig::default();
        config.defaults.discovery_cache_ttl_secs = -1;
        assert!(matches!(config.validate(), Err(VpnError::Config(_))));

        config.defaults.discovery_cache_ttl_secs = i64::MAX;
        assert!(matches!(config.validate(), Err(VpnError::Config(_))));

        config.defaults.discovery_cache_ttl_secs = MAX_DISCOVERY_CACHE_TTL_SECS;
        assert!(config.validate().is_ok());
    }
}
