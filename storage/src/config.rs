// storage/src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_yaml2 as serde_yaml;

use models::errors::{EmrError, EmrResult};

pub const DEFAULT_DATA_DIR_NAME: &str = ".clinicdb";
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DATA_DIR_ENV: &str = "CLINICDB_DATA_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageEngineKind {
    Memory,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub engine: StorageEngineKind,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            engine: StorageEngineKind::Sled,
            data_dir: default_data_dir(),
        }
    }
}

/// Top-level shape of the YAML file: everything under a `storage:` key so
/// the file can grow other sections without breaking old readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigWrapper {
    storage: StorageConfig,
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(DEFAULT_DATA_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join(DEFAULT_CONFIG_FILE)
}

/// Loads the storage configuration. Precedence: explicit path, then the
/// default config file if present, then built-in defaults. The data dir can
/// always be overridden with `CLINICDB_DATA_DIR`.
pub fn load_config(path: Option<&Path>) -> EmrResult<StorageConfig> {
    let candidate = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let mut config = if candidate.exists() {
        let content = fs::read_to_string(&candidate)?;
        let wrapper: ConfigWrapper = serde_yaml::from_str(&content).map_err(|e| {
            EmrError::Internal(format!(
                "failed to parse config at {}: {}",
                candidate.display(),
                e
            ))
        })?;
        info!("Loaded storage config from {}", candidate.display());
        wrapper.storage
    } else {
        if path.is_some() {
            warn!(
                "Config file {} not found, using defaults",
                candidate.display()
            );
        }
        StorageConfig::default()
    };

    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            config.data_dir = PathBuf::from(dir);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fall_back_to_defaults_when_no_file_exists() {
        let config = load_config(Some(Path::new("/nonexistent/clinicdb.yaml"))).unwrap();
        assert_eq!(config.engine, StorageEngineKind::Sled);
    }

    #[test]
    fn should_parse_yaml_wrapper() {
        let yaml = "storage:\n  engine: memory\n  data_dir: /var/lib/clinicdb\n";
        let wrapper: ConfigWrapper = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(wrapper.storage.engine, StorageEngineKind::Memory);
        assert_eq!(wrapper.storage.data_dir, PathBuf::from("/var/lib/clinicdb"));
    }
}
