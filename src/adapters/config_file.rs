//! JSON file configuration adapter.
//!
//! Implements [`ConfigPort`] on top of a single JSON document.  Missing
//! fields fall back to their defaults, so a file only needs the values it
//! overrides.  Both directions validate: an out-of-range file is rejected on
//! load, and an invalid config is never written.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::ConfigPort;
use crate::config::SystemConfig;
use crate::error::ConfigError;

/// Config stored as pretty-printed JSON at a fixed path.
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound,
            _ => {
                warn!("ConfigStore: cannot read {}: {}", self.path.display(), e);
                ConfigError::IoError
            }
        })?;

        let config: SystemConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("ConfigStore: {} is not valid config: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        config.validate()?;

        info!("ConfigStore: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::Corrupted)?;
        fs::write(&self.path, text).map_err(|e| {
            warn!("ConfigStore: cannot write {}: {}", self.path.display(), e);
            ConfigError::IoError
        })?;
        info!("ConfigStore: saved {}", self.path.display());
        Ok(())
    }
}
