// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchmillError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A builder failed for a single source file. Recovered locally by the
    /// Filer: prior good artifacts stay in place, other files keep building.
    #[error("Builder '{builder}' failed for {source} [{build}]: {message}")]
    BuilderError {
        builder: String,
        source: String,
        build: String,
        message: String,
    },

    /// The underlying OS watch failed. Propagated, since it compromises the
    /// live-rebuild guarantee.
    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Meta record error: {0}")]
    MetaError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchmillError>;
