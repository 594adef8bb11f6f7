pub mod duration;
pub mod error;

pub use duration::parse_duration;
pub use error::*;

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing directly at a config file
pub const CONFIG_PATH_ENV: &str = "STRATUS_CONFIG_PATH";

const CANDIDATES: [&str; 2] = ["stratus.local.yaml", "stratus.yaml"];

/// Find the provider configuration file
///
/// Search order:
/// 1. `STRATUS_CONFIG_PATH` environment variable
/// 2. current directory: stratus.local.yaml, stratus.yaml
/// 3. `./.stratus/` directory, same order
/// 4. `~/.config/stratus/stratus.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} points at missing file {}, falling back to search",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let stratus_dir = current_dir.join(".stratus");
    if stratus_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = stratus_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("stratus").join("stratus.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load the configuration, falling back to defaults when no file exists
pub fn load() -> Result<ProviderConfig> {
    match find_config_file() {
        Ok(path) => load_from(&path),
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using defaults");
            Ok(ProviderConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Load the configuration from a specific file
pub fn load_from(path: &Path) -> Result<ProviderConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProviderConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        "Loaded config from {} ({} timeout overrides)",
        path.display(),
        config.timeouts.len()
    );
    Ok(config)
}

/// Provider configuration
///
/// ```yaml
/// region: eu-west-1
/// waiter:
///   poll_interval: 10s
///   not_found_checks: 30
/// timeouts:
///   aws_rekognition_stream_processor:
///     create: 45m
///     delete: 10m
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Region override; the SDK default chain is used when unset
    pub region: Option<String>,

    /// Waiter tuning applied to every resource
    pub waiter: WaiterSettings,

    /// Timeouts indexed by resource type name
    pub timeouts: HashMap<String, TimeoutSettings>,
}

impl ProviderConfig {
    /// Timeout overrides for a resource type (empty if not configured)
    pub fn timeouts_for(&self, resource_type: &str) -> TimeoutSettings {
        self.timeouts
            .get(resource_type)
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaiterSettings {
    /// Fixed interval between polls instead of exponential backoff
    #[serde(deserialize_with = "duration::deserialize_optional")]
    pub poll_interval: Option<Duration>,

    pub not_found_checks: Option<u32>,

    pub continuous_target_occurrence: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    #[serde(deserialize_with = "duration::deserialize_optional")]
    pub create: Option<Duration>,

    #[serde(deserialize_with = "duration::deserialize_optional")]
    pub update: Option<Duration>,

    #[serde(deserialize_with = "duration::deserialize_optional")]
    pub delete: Option<Duration>,
}
