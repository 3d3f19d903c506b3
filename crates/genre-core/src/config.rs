//! YAML configuration I/O
//!
//! Works with any serializable configuration type. Missing or unparsable
//! files fall back to defaults so a broken config never blocks startup.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A configuration document that can clamp or repair its own values
pub trait ConfigFile: DeserializeOwned + Serialize + Default {
    /// Called after every successful load
    fn validate(&mut self) {}
}

/// Default location for an application's config file
///
/// Returns: `<config_dir>/<app_name>/config.yaml`
pub fn default_config_path(app_name: &str) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
        .join("config.yaml")
}

/// Load configuration from a YAML file, falling back to defaults
pub fn load_config<T: ConfigFile>(path: &Path) -> T {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return T::default();
    }

    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                T::default()
            }
        },
        Err(e) => {
            log::warn!("load_config: Failed to read config file: {}, using defaults", e);
            T::default()
        }
    };

    config.validate();
    config
}

/// Save configuration to a YAML file, creating parent directories
pub fn save_config<T: ConfigFile>(config: &T, path: &Path) -> Result<()> {
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}
