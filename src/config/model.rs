// src/config/model.rs

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::build::BuildConfig;
use crate::errors::WatchmillError;

/// Raw deserialization target for `Watchmill.toml`. Validation happens in
/// [`crate::config::validate`], which turns this into a [`ConfigFile`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    pub filer: RawFilerSection,
    #[serde(default)]
    pub build: BTreeMap<String, RawBuildSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFilerSection {
    pub source_dirs: Vec<String>,
    pub build_dir: String,
    pub debounce_ms: Option<u64>,
    pub max_parallel: Option<usize>,
    pub target: Option<String>,
    pub watch: Option<bool>,
    #[serde(default)]
    pub source_map: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBuildSection {
    pub platform: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Which output tree to write into. Selects the `dev/` or `prod/` subtree of
/// the build directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Dev,
    Prod,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Dev => "dev",
            Target::Prod => "prod",
        }
    }
}

impl FromStr for Target {
    type Err = WatchmillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Target::Dev),
            "prod" => Ok(Target::Prod),
            other => Err(WatchmillError::ConfigError(format!(
                "invalid target '{other}', expected 'dev' or 'prod'"
            ))),
        }
    }
}

/// Maps remote specifier prefixes to local directories, longest prefix first.
///
/// An import of `https://cdn.example.com/lib/a.ts` with an entry
/// `https://cdn.example.com/ -> vendor/cdn` resolves to `vendor/cdn/lib/a.ts`.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    entries: Vec<(String, String)>,
}

impl SourceMap {
    pub fn new(map: BTreeMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = map.into_iter().collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrites `specifier` through the first (longest) matching prefix, or
    /// returns `None` when no entry applies.
    pub fn apply(&self, specifier: &str) -> Option<String> {
        for (prefix, local) in &self.entries {
            if let Some(rest) = specifier.strip_prefix(prefix.as_str()) {
                let rest = rest.trim_start_matches('/');
                if rest.is_empty() {
                    return Some(local.clone());
                }
                return Some(format!("{}/{}", local.trim_end_matches('/'), rest));
            }
        }
        None
    }
}

/// Validated `[filer]` section.
#[derive(Debug, Clone)]
pub struct FilerSettings {
    pub source_dirs: Vec<PathBuf>,
    pub build_dir: PathBuf,
    pub debounce: Duration,
    pub target: Target,
    pub watch: bool,
    pub source_map: SourceMap,
    pub max_parallel: usize,
}

/// Fully validated configuration: settings plus build configs sorted by name.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub filer: FilerSettings,
    pub builds: Vec<BuildConfig>,
}

impl ConfigFile {
    pub fn build(&self, name: &str) -> Option<&BuildConfig> {
        self.builds.iter().find(|b| b.name == name)
    }
}
