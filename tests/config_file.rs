// tests/config_file.rs
//
// Loading Watchmill.toml from a real directory, end to end.

use std::sync::Arc;
use std::time::Duration;

use watchmill::config::{Target, load_config};
use watchmill::errors::WatchmillError;
use watchmill::fs::{FileSystem, OsFileSystem};

fn os_fs() -> Arc<dyn FileSystem> {
    Arc::new(OsFileSystem)
}

#[test]
fn full_config_loads_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let toml = format!(
        r#"
[filer]
source_dirs = ["{src}"]
build_dir = "{build}"
debounce_ms = 25
max_parallel = 2
target = "prod"
watch = false

[filer.source_map]
"https://cdn.example.com/" = "vendor/cdn"

[build.browser]
platform = "browser"
include = ["**/*.ts", "**/*.css"]
exclude = ["**/*.test.ts"]

[build.node]
platform = "node"
include = ["**/*.ts"]
"#,
        src = root.join("src").display(),
        build = root.join("build").display(),
    );
    let config_path = root.join("Watchmill.toml");
    std::fs::write(&config_path, toml).unwrap();

    let config = load_config(&os_fs(), &config_path).unwrap();

    assert_eq!(config.filer.source_dirs, vec![root.join("src")]);
    assert_eq!(config.filer.build_dir, root.join("build"));
    assert_eq!(config.filer.debounce, Duration::from_millis(25));
    assert_eq!(config.filer.max_parallel, 2);
    assert_eq!(config.filer.target, Target::Prod);
    assert!(!config.filer.watch);
    assert_eq!(
        config.filer.source_map.apply("https://cdn.example.com/x.ts"),
        Some("vendor/cdn/x.ts".to_string())
    );

    let names: Vec<&str> = config.builds.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["browser", "node"]);

    let browser = config.build("browser").unwrap();
    assert!(browser.accepts("pages/index.ts"));
    assert!(browser.accepts("styles/site.css"));
    assert!(!browser.accepts("pages/index.test.ts"));

    let node = config.build("node").unwrap();
    assert!(!node.accepts("styles/site.css"));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let err = load_config(&os_fs(), &tmp.path().join("Watchmill.toml")).unwrap_err();
    match err {
        WatchmillError::ConfigError(msg) => assert!(msg.contains("not found")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("Watchmill.toml");
    std::fs::write(&config_path, "[filer\nsource_dirs = ").unwrap();

    let err = load_config(&os_fs(), &config_path).unwrap_err();
    assert!(matches!(err, WatchmillError::TomlError(_)));
}

#[test]
fn overlapping_build_dir_is_rejected_at_load() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let toml = format!(
        r#"
[filer]
source_dirs = ["{src}"]
build_dir = "{build}"

[build.browser]
platform = "browser"
"#,
        src = root.join("src").display(),
        build = root.join("src/build").display(),
    );
    let config_path = root.join("Watchmill.toml");
    std::fs::write(&config_path, toml).unwrap();

    let err = load_config(&os_fs(), &config_path).unwrap_err();
    assert!(err.to_string().contains("overlaps"));
}
