// tests/common/mod.rs

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use watchmill::build::BuilderSelector;
use watchmill::config::ConfigFile;
use watchmill::filer::{Filer, FilerOptions};
use watchmill::fs::FileSystem;
use watchmill::fs::mock::MockFileSystem;
use watchmill::watch::{ChangeKind, WatchChange};

pub use watchmill_test_utils::builders::ConfigBuilder;
pub use watchmill_test_utils::fake_builder::{FakeBuilder, fake_selector};
pub use watchmill_test_utils::{init_tracing, with_timeout};

pub fn mock_fs() -> Arc<MockFileSystem> {
    Arc::new(MockFileSystem::new())
}

pub fn filer(fs: &Arc<MockFileSystem>, config: ConfigFile, selector: BuilderSelector) -> Filer {
    Filer::new(FilerOptions {
        fs: Arc::clone(fs) as Arc<dyn FileSystem>,
        config,
        selector,
        clean: false,
    })
}

pub fn fake_filer(
    fs: &Arc<MockFileSystem>,
    config: ConfigFile,
    builder: &Arc<FakeBuilder>,
) -> Filer {
    filer(fs, config, fake_selector(Arc::clone(builder)))
}

/// One `[build.browser]` config over `/proj/src` accepting every `.ts` file.
pub fn ts_config() -> ConfigFile {
    ConfigBuilder::new("/proj/src", "/proj/build")
        .build_section("browser", "browser", &["**/*.ts"])
        .build()
}

pub fn change(kind: ChangeKind, path: &str) -> WatchChange {
    WatchChange {
        kind,
        path: PathBuf::from(path),
    }
}

pub fn exists(fs: &Arc<MockFileSystem>, path: &str) -> bool {
    fs.exists(std::path::Path::new(path))
}

pub fn read_str(fs: &Arc<MockFileSystem>, path: &str) -> String {
    let bytes = fs
        .read_file(std::path::Path::new(path))
        .unwrap_or_else(|_| panic!("missing file: {path}"));
    String::from_utf8(bytes).expect("expected utf-8 content")
}
