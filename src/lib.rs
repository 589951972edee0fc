// src/lib.rs

//! watchmill: an incremental build engine.
//!
//! Watches source directories, runs pluggable builders over files that
//! changed, and tracks the dependencies each build reports so an edit
//! rebuilds only the files it actually affects. Artifacts land under
//! `<build_dir>/<dev|prod>/<config>/`, with cache metadata under
//! `<build_dir>/meta/`.

pub mod build;
pub mod cli;
pub mod config;
pub mod errors;
pub mod filer;
pub mod fs;
pub mod hash;
pub mod logging;
pub mod meta;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::build::default_selector;
use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::model::Target;
use crate::errors::Result;
use crate::filer::{Filer, FilerOptions};
use crate::fs::{FileSystem, OsFileSystem};

/// Entry point behind `main`: load the config, run the initial build, then
/// keep watching unless `--once` or `watch = false` says otherwise.
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem);
    let mut config = config::load_config(&fs, Path::new(&args.config))?;

    if args.dev {
        config.filer.target = Target::Dev;
    }
    if args.once {
        config.filer.watch = false;
    }

    if args.dry_run {
        print_plan(&config);
        return Ok(());
    }

    let mut filer = Filer::new(FilerOptions {
        fs,
        config,
        selector: default_selector(),
        clean: args.clean,
    });
    filer.init().await?;

    if filer.watching() {
        tokio::select! {
            result = filer.run() => result?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
            }
        }
    }
    filer.close().await?;
    Ok(())
}

/// `--dry-run` output: the resolved plan on stdout, nothing written.
fn print_plan(config: &ConfigFile) {
    println!("target: {}", config.filer.target.as_str());
    println!("build_dir: {}", config.filer.build_dir.display());
    for dir in &config.filer.source_dirs {
        println!("source_dir: {}", dir.display());
    }
    for build in &config.builds {
        println!("build: {} ({})", build.name, build.platform.as_str());
    }
}
