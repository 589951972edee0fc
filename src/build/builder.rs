// src/build/builder.rs

use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::build::build_file::BuildFile;
use crate::build::config::BuildConfig;
use crate::build::source_file::SourceFile;
use crate::config::model::{SourceMap, Target};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Everything a builder may consult besides the source file itself. Injected
/// per invocation; builders hold no state of their own across calls and never
/// see each other.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub fs: &'a Arc<dyn FileSystem>,
    /// The config this invocation builds for.
    pub config: &'a BuildConfig,
    /// Every configured build, for builders that emit per-config variants.
    pub configs: &'a [BuildConfig],
    pub target: Target,
    /// Root of the output tree (the configured build dir).
    pub output_root: &'a Path,
    pub source_map: &'a SourceMap,
}

/// Transforms one source file into zero or more artifacts.
///
/// Object-safe so the Filer can hold heterogeneous builders behind
/// `Arc<dyn Builder>`; implementations box their futures by hand. `init` and
/// `on_remove` are optional capabilities with no-op defaults.
pub trait Builder: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn build<'a>(
        &'a self,
        source: &'a SourceFile,
        ctx: &'a BuildContext<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BuildFile>>> + Send + 'a>>;

    /// One-time warmup, awaited before this builder's first `build` of a job.
    /// May run more than once per process; guard internally if that matters.
    fn init<'a>(
        &'a self,
        ctx: &'a BuildContext<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let _ = ctx;
        Box::pin(std::future::ready(Ok(())))
    }

    /// Called when a source file this builder produced artifacts for is
    /// deleted, so side-table state keyed by the source can be dropped.
    fn on_remove(&self, source_id: &str, ctx: &BuildContext<'_>) {
        let _ = (source_id, ctx);
    }
}

/// Picks the builder for a given config and source id. Injected into the
/// Filer so embedders can route files to their own builders.
pub type BuilderSelector = Arc<dyn Fn(&BuildConfig, &str) -> Arc<dyn Builder> + Send + Sync>;
