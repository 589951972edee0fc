// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::build::BuildConfig;
use crate::config::model::{ConfigFile, FilerSettings, RawConfigFile, SourceMap, Target};
use crate::errors::WatchmillError;
use crate::types::Platform;
use crate::watch::filter::PathFilter;

const DEFAULT_DEBOUNCE_MS: u64 = 10;

fn default_max_parallel() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchmillError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        let source_dirs = validate_source_dirs(&raw.filer.source_dirs)?;
        let build_dir = validate_build_dir(&raw.filer.build_dir, &source_dirs)?;

        let target = match raw.filer.target.as_deref() {
            Some(s) => Target::from_str(s)?,
            None => Target::default(),
        };

        let max_parallel = match raw.filer.max_parallel {
            Some(0) => {
                return Err(WatchmillError::ConfigError(
                    "max_parallel must be at least 1".to_string(),
                ));
            }
            Some(n) => n,
            None => default_max_parallel(),
        };

        let filer = FilerSettings {
            source_dirs,
            build_dir,
            debounce: Duration::from_millis(raw.filer.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
            target,
            watch: raw.filer.watch.unwrap_or(true),
            source_map: SourceMap::new(raw.filer.source_map),
            max_parallel,
        };

        if raw.build.is_empty() {
            return Err(WatchmillError::ConfigError(
                "config must define at least one [build.<name>] section".to_string(),
            ));
        }

        let mut builds = Vec::with_capacity(raw.build.len());
        for (name, section) in raw.build {
            validate_build_name(&name)?;
            let platform = Platform::from_str(&section.platform).map_err(|_| {
                WatchmillError::ConfigError(format!(
                    "build '{name}': invalid platform '{}', expected 'browser' or 'node'",
                    section.platform
                ))
            })?;
            let filter = PathFilter::new(&section.include, &section.exclude).map_err(|e| {
                WatchmillError::ConfigError(format!("build '{name}': bad pattern: {e}"))
            })?;
            builds.push(BuildConfig::new(name, platform, filter));
        }
        builds.sort();

        Ok(ConfigFile { filer, builds })
    }
}

fn validate_source_dirs(dirs: &[String]) -> Result<Vec<PathBuf>, WatchmillError> {
    if dirs.is_empty() {
        return Err(WatchmillError::ConfigError(
            "source_dirs must not be empty".to_string(),
        ));
    }
    let mut out = Vec::with_capacity(dirs.len());
    for dir in dirs {
        if dir.trim().is_empty() {
            return Err(WatchmillError::ConfigError(
                "source_dirs entries must not be empty".to_string(),
            ));
        }
        out.push(PathBuf::from(dir));
    }
    Ok(out)
}

/// The build directory must not sit inside a watched source directory, or
/// every build output would feed straight back into the watcher.
fn validate_build_dir(dir: &str, source_dirs: &[PathBuf]) -> Result<PathBuf, WatchmillError> {
    if dir.trim().is_empty() {
        return Err(WatchmillError::ConfigError(
            "build_dir must not be empty".to_string(),
        ));
    }
    let build_dir = PathBuf::from(dir);
    for src in source_dirs {
        if build_dir.starts_with(src) || src.starts_with(&build_dir) {
            return Err(WatchmillError::ConfigError(format!(
                "build_dir '{}' overlaps source dir '{}'",
                build_dir.display(),
                src.display()
            )));
        }
    }
    Ok(build_dir)
}

/// Build names become path segments under the build directory.
fn validate_build_name(name: &str) -> Result<(), WatchmillError> {
    if name.is_empty() {
        return Err(WatchmillError::ConfigError(
            "build names must not be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') || name == "meta" {
        return Err(WatchmillError::ConfigError(format!(
            "build name '{name}' is reserved or contains a path separator"
        )));
    }
    if Path::new(name).components().count() != 1 {
        return Err(WatchmillError::ConfigError(format!(
            "build name '{name}' must be a single path segment"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<ConfigFile, WatchmillError> {
        let raw: RawConfigFile = toml::from_str(toml).map_err(WatchmillError::from)?;
        ConfigFile::try_from(raw)
    }

    const MINIMAL: &str = r#"
        [filer]
        source_dirs = ["src"]
        build_dir = "build"

        [build.browser]
        platform = "browser"
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.filer.debounce, Duration::from_millis(10));
        assert_eq!(config.filer.target, Target::Dev);
        assert!(config.filer.watch);
        assert!(config.filer.max_parallel >= 1);
        assert_eq!(config.builds.len(), 1);
        assert_eq!(config.builds[0].name, "browser");
        assert_eq!(config.builds[0].platform, Platform::Browser);
    }

    #[test]
    fn builds_are_sorted_by_name() {
        let config = parse(
            r#"
            [filer]
            source_dirs = ["src"]
            build_dir = "build"

            [build.zeta]
            platform = "node"

            [build.alpha]
            platform = "browser"
            "#,
        )
        .unwrap();
        let names: Vec<&str> = config.builds.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn missing_build_section_is_an_error() {
        let err = parse(
            r#"
            [filer]
            source_dirs = ["src"]
            build_dir = "build"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, WatchmillError::ConfigError(_)));
    }

    #[test]
    fn build_dir_inside_source_dir_is_rejected() {
        let err = parse(
            r#"
            [filer]
            source_dirs = ["src"]
            build_dir = "src/build"

            [build.browser]
            platform = "browser"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn reserved_build_name_is_rejected() {
        let err = parse(
            r#"
            [filer]
            source_dirs = ["src"]
            build_dir = "build"

            [build.meta]
            platform = "browser"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, WatchmillError::ConfigError(_)));
    }

    #[test]
    fn zero_max_parallel_is_rejected() {
        let err = parse(
            r#"
            [filer]
            source_dirs = ["src"]
            build_dir = "build"
            max_parallel = 0

            [build.browser]
            platform = "browser"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_parallel"));
    }

    #[test]
    fn invalid_platform_is_rejected() {
        let err = parse(
            r#"
            [filer]
            source_dirs = ["src"]
            build_dir = "build"

            [build.browser]
            platform = "wasi"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("platform"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = parse(
            r#"
            [filer]
            source_dirs = ["src"]
            build_dir = "build"
            typo_key = true

            [build.browser]
            platform = "browser"
            "#,
        );
        assert!(result.is_err());
    }
}
