#![allow(dead_code)]

use std::collections::BTreeMap;
use watchmill::config::{ConfigFile, RawBuildSection, RawConfigFile, RawFilerSection};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Produces the same validated value `load_config` would, without a config
/// file on disk. Watch mode is off by default so tests drive the Filer
/// synchronously through `init`.
pub struct ConfigBuilder {
    raw: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new(source_dir: &str, build_dir: &str) -> Self {
        Self {
            raw: RawConfigFile {
                filer: RawFilerSection {
                    source_dirs: vec![source_dir.to_string()],
                    build_dir: build_dir.to_string(),
                    debounce_ms: Some(5),
                    max_parallel: None,
                    target: None,
                    watch: Some(false),
                    source_map: BTreeMap::new(),
                },
                build: BTreeMap::new(),
            },
        }
    }

    pub fn source_dir(mut self, dir: &str) -> Self {
        self.raw.filer.source_dirs.push(dir.to_string());
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.raw.filer.debounce_ms = Some(ms);
        self
    }

    pub fn max_parallel(mut self, n: usize) -> Self {
        self.raw.filer.max_parallel = Some(n);
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.raw.filer.target = Some(target.to_string());
        self
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.raw.filer.watch = Some(watch);
        self
    }

    pub fn map_source(mut self, prefix: &str, local: &str) -> Self {
        self.raw
            .filer
            .source_map
            .insert(prefix.to_string(), local.to_string());
        self
    }

    /// Adds a `[build.<name>]` section with the given include patterns and no
    /// excludes.
    pub fn build_section(self, name: &str, platform: &str, include: &[&str]) -> Self {
        self.build_section_full(name, platform, include, &[])
    }

    pub fn build_section_full(
        mut self,
        name: &str,
        platform: &str,
        include: &[&str],
        exclude: &[&str],
    ) -> Self {
        self.raw.build.insert(
            name.to_string(),
            RawBuildSection {
                platform: platform.to_string(),
                include: include.iter().map(|s| s.to_string()).collect(),
                exclude: exclude.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}
