// src/config/loader.rs

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchmillError};
use crate::fs::FileSystem;

/// Reads and validates a `Watchmill.toml` from `path`.
pub fn load_config(fs: &Arc<dyn FileSystem>, path: &Path) -> Result<ConfigFile> {
    if !fs.exists(path) {
        return Err(WatchmillError::ConfigError(format!(
            "config file not found: {}",
            path.display()
        )));
    }

    let bytes = fs.read_file(path)?;
    let text = String::from_utf8(bytes).map_err(|_| {
        WatchmillError::ConfigError(format!("config file is not UTF-8: {}", path.display()))
    })?;

    let raw: RawConfigFile = toml::from_str(&text)?;
    let config = ConfigFile::try_from(raw)?;
    debug!(
        source_dirs = config.filer.source_dirs.len(),
        builds = config.builds.len(),
        "loaded config"
    );
    Ok(config)
}
