// src/config/mod.rs

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::load_config;
pub use model::{
    ConfigFile, FilerSettings, RawBuildSection, RawConfigFile, RawFilerSection, SourceMap, Target,
};
