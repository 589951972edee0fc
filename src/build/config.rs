// src/build/config.rs

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::types::Platform;
use crate::watch::filter::PathFilter;

/// One named output tree: every accepted source file is built once per
/// config, into `<build_dir>/<target>/<name>/`.
///
/// Identity is the name alone; two configs with the same name are the same
/// config for equality, ordering, and hashing.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub name: String,
    pub platform: Platform,
    pub filter: PathFilter,
}

impl BuildConfig {
    pub fn new(name: impl Into<String>, platform: Platform, filter: PathFilter) -> Self {
        Self {
            name: name.into(),
            platform,
            filter,
        }
    }

    /// Whether `rel_path` (forward-slash, relative to a source dir) is an
    /// input of this config.
    pub fn accepts(&self, rel_path: &str) -> bool {
        self.filter.matches(rel_path)
    }
}

impl PartialEq for BuildConfig {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for BuildConfig {}

impl PartialOrd for BuildConfig {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildConfig {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for BuildConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, platform: Platform) -> BuildConfig {
        BuildConfig::new(name, platform, PathFilter::match_all())
    }

    #[test]
    fn identity_is_by_name() {
        assert_eq!(
            config("browser", Platform::Browser),
            config("browser", Platform::Node)
        );
        assert_ne!(
            config("browser", Platform::Browser),
            config("node", Platform::Browser)
        );
    }

    #[test]
    fn ordering_follows_name() {
        let mut configs = vec![config("node", Platform::Node), config("browser", Platform::Browser)];
        configs.sort();
        assert_eq!(configs[0].name, "browser");
    }
}
