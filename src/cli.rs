// src/cli.rs

//! The clap-derived command line.

use clap::{Parser, ValueEnum};

/// Arguments accepted by the `watchmill` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchmill",
    version,
    about = "Incremental build engine: watch sources, rebuild only what changed."
)]
pub struct CliArgs {
    /// Config file to load (TOML), `Watchmill.toml` by default.
    #[arg(long, value_name = "PATH", default_value = "Watchmill.toml")]
    pub config: String,

    /// Build everything once and exit instead of watching.
    #[arg(long)]
    pub once: bool,

    /// Force the dev target (outputs under `<build_dir>/dev/`), overriding
    /// the config's `target` setting.
    #[arg(long)]
    pub dev: bool,

    /// Empty the build directory (outputs and cached metadata) before
    /// building.
    #[arg(long)]
    pub clean: bool,

    /// Log verbosity; `WATCHMILL_LOG` applies when this is omitted.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print the resolved plan, build nothing.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The `EnvFilter` directive equivalent of this level.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
