// src/filer/job.rs

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::paths::{OutputLayout, find_source_path};
use crate::build::{BuildConfig, BuildContext, BuildDependency, BuildFile, BuilderSelector, SourceFile};
use crate::config::model::{SourceMap, Target};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::hash;
use crate::meta::{MetaStore, SourceMeta};

/// One spawned build for a single source id. Everything it touches is its
/// own clone; it reports back to the Filer loop through a channel and never
/// writes shared state directly.
pub(crate) struct BuildJob {
    pub source_id: String,
    pub path: PathBuf,
    /// The configs this job builds; a subset of `all_configs`.
    pub configs: Vec<BuildConfig>,
    pub all_configs: Arc<[BuildConfig]>,
    pub check_cache: bool,
    pub target: Target,
    pub source_map: SourceMap,
    pub layout: OutputLayout,
    pub source_dirs: Vec<PathBuf>,
    pub store: MetaStore,
    pub fs: Arc<dyn FileSystem>,
    pub selector: BuilderSelector,
}

#[derive(Debug)]
pub(crate) enum JobOutcome {
    /// The source vanished before it could be read.
    SourceGone { source_id: String },
    Completed {
        source_id: String,
        content_hash: String,
        results: Vec<ConfigResult>,
    },
}

#[derive(Debug)]
pub(crate) struct ConfigResult {
    pub config: String,
    pub kind: ConfigResultKind,
}

#[derive(Debug)]
pub(crate) enum ConfigResultKind {
    /// Meta record was fresh and every output exists; no builder ran.
    CacheHit {
        outputs: Vec<String>,
        dependencies: Vec<BuildDependency>,
    },
    Built {
        outputs: Vec<BuiltOutput>,
        dependencies: Vec<BuildDependency>,
    },
    Failed { builder: String, message: String },
}

#[derive(Debug)]
pub(crate) struct BuiltOutput {
    pub build_id: String,
    /// False when the artifact on disk already had identical content and the
    /// write was skipped.
    pub changed: bool,
}

impl BuildJob {
    pub async fn run(self) -> JobOutcome {
        let source = match SourceFile::load(&self.fs, self.source_id.clone(), &self.path) {
            Ok(source) => source,
            Err(e) => {
                debug!(source = %self.source_id, error = %e, "source unreadable, treating as deleted");
                return JobOutcome::SourceGone {
                    source_id: self.source_id,
                };
            }
        };

        let meta = if self.check_cache {
            self.store
                .load(&source.id)
                .filter(|m| m.is_up_to_date(&source.content_hash))
        } else {
            None
        };
        let mut dep_fresh: HashMap<String, bool> = HashMap::new();
        let mut initialized: BTreeSet<String> = BTreeSet::new();

        let mut results = Vec::with_capacity(self.configs.len());
        for config in &self.configs {
            if let Some(meta) = &meta {
                if let Some(hit) = self.try_cache_hit(config, meta, &mut dep_fresh) {
                    debug!(source = %source.id, config = %config.name, "cache hit");
                    results.push(ConfigResult {
                        config: config.name.clone(),
                        kind: hit,
                    });
                    continue;
                }
            }
            let kind = self.build_config(&source, config, &mut initialized).await;
            results.push(ConfigResult {
                config: config.name.clone(),
                kind,
            });
        }

        JobOutcome::Completed {
            source_id: source.id,
            content_hash: source.content_hash,
            results,
        }
    }

    /// A config is a hit when its record exists, every recorded output is
    /// still on disk, and every recorded dependency is up to date. The
    /// caller already verified the source hash.
    fn try_cache_hit(
        &self,
        config: &BuildConfig,
        meta: &SourceMeta,
        dep_fresh: &mut HashMap<String, bool>,
    ) -> Option<ConfigResultKind> {
        let record = meta.builds.get(&config.name)?;
        for build_id in &record.outputs {
            if !self.fs.exists(&self.layout.output_path(&config.name, build_id)) {
                return None;
            }
        }

        let dependencies: Vec<BuildDependency> = record
            .dependencies
            .iter()
            .map(|d| d.restore(&self.source_id))
            .collect();
        for dep in &dependencies {
            if dep.external {
                continue;
            }
            let fresh = *dep_fresh
                .entry(dep.build_id.clone())
                .or_insert_with_key(|id| self.dep_is_fresh(id));
            if !fresh {
                return None;
            }
        }

        Some(ConfigResultKind::CacheHit {
            outputs: record.outputs.clone(),
            dependencies,
        })
    }

    /// A dependency is fresh when its source still exists and hashes to what
    /// its own meta record says. This stays valid regardless of the order
    /// baseline changes are processed in.
    fn dep_is_fresh(&self, dep_id: &str) -> bool {
        let Some(dep_meta) = self.store.load(dep_id) else {
            return false;
        };
        let Some(dep_path) = find_source_path(&self.fs, &self.source_dirs, dep_id) else {
            return false;
        };
        match hash::hash_file(&self.fs, &dep_path) {
            Ok(h) => h == dep_meta.content_hash,
            Err(_) => false,
        }
    }

    async fn build_config(
        &self,
        source: &SourceFile,
        config: &BuildConfig,
        initialized: &mut BTreeSet<String>,
    ) -> ConfigResultKind {
        let builder = (self.selector)(config, &source.id);
        let ctx = BuildContext {
            fs: &self.fs,
            config,
            configs: &self.all_configs,
            target: self.target,
            output_root: self.layout.build_dir(),
            source_map: &self.source_map,
        };
        if initialized.insert(builder.name().to_string()) {
            if let Err(e) = builder.init(&ctx).await {
                warn!(
                    source = %source.id,
                    config = %config.name,
                    builder = builder.name(),
                    error = %e,
                    "builder init failed"
                );
                return ConfigResultKind::Failed {
                    builder: builder.name().to_string(),
                    message: e.to_string(),
                };
            }
        }
        let started = Instant::now();
        match builder.build(source, &ctx).await {
            Ok(files) => match self.write_outputs(config, files) {
                Ok((outputs, dependencies)) => {
                    info!(
                        source = %source.id,
                        config = %config.name,
                        builder = builder.name(),
                        outputs = outputs.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "built"
                    );
                    ConfigResultKind::Built {
                        outputs,
                        dependencies,
                    }
                }
                Err(e) => {
                    warn!(
                        source = %source.id,
                        config = %config.name,
                        builder = builder.name(),
                        error = %e,
                        "failed to write outputs"
                    );
                    ConfigResultKind::Failed {
                        builder: builder.name().to_string(),
                        message: e.to_string(),
                    }
                }
            },
            Err(e) => {
                warn!(
                    source = %source.id,
                    config = %config.name,
                    builder = builder.name(),
                    error = %e,
                    "builder failed"
                );
                ConfigResultKind::Failed {
                    builder: builder.name().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Writes artifacts under the config subtree, skipping writes whose
    /// content is already on disk so unchanged outputs do not ripple through
    /// the dependency graph.
    fn write_outputs(
        &self,
        config: &BuildConfig,
        files: Vec<BuildFile>,
    ) -> Result<(Vec<BuiltOutput>, Vec<BuildDependency>)> {
        let mut outputs = Vec::with_capacity(files.len());
        let mut dependencies = Vec::new();

        for mut file in files {
            if file.id.is_empty() || file.id.split('/').any(|seg| seg == ".." || seg.is_empty()) {
                return Err(anyhow::anyhow!("builder produced invalid output id '{}'", file.id).into());
            }
            let path = self.layout.output_path(&config.name, &file.id);
            let new_hash = file.hash().to_string();
            let changed = match self.fs.read_file(&path) {
                Ok(existing) => hash::hash_bytes(&existing) != new_hash,
                Err(_) => true,
            };
            if changed {
                self.fs.write_file(&path, file.content.as_bytes())?;
            }
            dependencies.extend(file.dependencies.iter().cloned());
            outputs.push(BuiltOutput {
                build_id: file.id,
                changed,
            });
        }

        let mut seen = BTreeSet::new();
        dependencies.retain(|d| seen.insert(d.build_id.clone()));
        Ok((outputs, dependencies))
    }
}
