//! Daemon configuration
//!
//! Loaded from an optional YAML/TOML/JSON file layered under environment
//! variables such as `ZONE_SYNC_API_PORT=9090` or
//! `ZONE_SYNC_SYNC__INTERVAL_SECS=600`.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zone_sync_lib::sync::SyncConfig;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "ZONE_SYNC_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "/etc/zone-sync/config.yaml";

const ENV_PREFIX: &str = "ZONE_SYNC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Name attached to structured log events
    pub instance_name: String,

    /// Port of the admin API (health, metrics, status, manual sync)
    pub api_port: u16,

    /// Zone store snapshot file
    pub store_path: PathBuf,

    /// Check the hub namespace at startup and log what is missing
    pub check_hub_on_startup: bool,

    pub sync: SyncConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: 8080,
            store_path: PathBuf::from("/var/lib/zone-sync/zones.json"),
            check_hub_on_startup: true,
            sync: SyncConfig::default(),
        }
    }
}

fn default_instance_name() -> String {
    std::env::var("POD_NAME").unwrap_or_else(|_| "zone-sync".to_string())
}

/// Environment source for the daemon's variables
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("sync.excluded_clusters")
}

impl DaemonConfig {
    /// Load from the file named by `ZONE_SYNC_CONFIG` (if present) and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_with(Path::new(&path), environment())
    }

    /// Load from `path` (optional) overlaid with `env`
    pub fn load_with(path: &Path, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;

        let daemon: DaemonConfig = config
            .try_deserialize()
            .context("Failed to parse daemon configuration")?;

        daemon
            .sync
            .validate()
            .context("Invalid sync configuration")?;

        Ok(daemon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(source))
    }

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let config =
            DaemonConfig::load_with(&temp_dir.path().join("missing.yaml"), env(&[])).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.store_path, PathBuf::from("/var/lib/zone-sync/zones.json"));
        assert!(config.sync.enabled);
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.sync.hub_namespace, "open-cluster-management");
        assert_eq!(config.sync.default_quota_percent, 80);
    }

    #[test]
    fn test_file_values_applied() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
api_port: 9100
store_path: /tmp/zones.json
sync:
  interval_secs: 600
  zone_prefix: edge
  excluded_clusters:
    - local-cluster
  required_labels:
    env: prod
"#,
        )
        .unwrap();

        let config = DaemonConfig::load_with(&path, env(&[])).unwrap();
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.sync.interval_secs, 600);
        assert_eq!(config.sync.zone_prefix, "edge");
        assert_eq!(config.sync.excluded_clusters, vec!["local-cluster"]);
        assert_eq!(config.sync.required_labels["env"], "prod");
        assert!(config.sync.auto_create_zones);
    }

    #[test]
    fn test_environment_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "api_port: 9100\nsync:\n  interval_secs: 600\n").unwrap();

        let config = DaemonConfig::load_with(
            &path,
            env(&[
                ("ZONE_SYNC_API_PORT", "9200"),
                ("ZONE_SYNC_SYNC__INTERVAL_SECS", "120"),
                ("ZONE_SYNC_SYNC__AUTO_CREATE_ZONES", "false"),
                ("ZONE_SYNC_SYNC__EXCLUDED_CLUSTERS", "a,b"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_port, 9200);
        assert_eq!(config.sync.interval_secs, 120);
        assert!(!config.sync.auto_create_zones);
        assert_eq!(config.sync.excluded_clusters, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_sync_settings_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "sync:\n  interval_secs: 5\n").unwrap();

        assert!(DaemonConfig::load_with(&path, env(&[])).is_err());
    }
}
