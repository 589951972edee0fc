// src/filer/mod.rs

//! The Filer: the event loop that turns watched file changes into minimal
//! rebuilds.
//!
//! All shared state (source table, dependency graph, meta records, path
//! memo) is owned by the loop and mutated only between awaits; build jobs run
//! as spawned tasks over their own clones and report back through a channel.
//! Builds are serialized per source id and concurrent across ids.

mod job;

pub mod graph;
pub mod paths;
pub mod pending;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::build::{BuildConfig, BuildContext, BuilderSelector};
use crate::config::model::{ConfigFile, FilerSettings};
use crate::errors::{Result, WatchmillError};
use crate::fs::FileSystem;
use crate::meta::{MetaBuild, MetaStore, SourceMeta};
use crate::watch::{ChangeKind, DirWatcher, WatchChange, watcher};

use graph::DependencyGraph;
use job::{BuildJob, ConfigResultKind, JobOutcome};
use paths::PathResolver;
use pending::{BuildScope, PendingAction, PendingSet};

pub struct FilerOptions {
    pub fs: Arc<dyn FileSystem>,
    pub config: ConfigFile,
    pub selector: BuilderSelector,
    /// Empty the build directory before the initial pass.
    pub clean: bool,
}

/// Counts accumulated since `init` started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub built: usize,
    pub cache_hits: usize,
    pub failed: usize,
    pub deleted: usize,
}

/// Loop-owned view of one source id.
#[derive(Debug, Default)]
struct SourceState {
    content_hash: String,
    /// config name -> build ids written for it
    outputs: BTreeMap<String, Vec<String>>,
    /// configs whose last build failed; prior artifacts stay on disk
    failed: BTreeSet<String>,
}

pub struct Filer {
    fs: Arc<dyn FileSystem>,
    settings: FilerSettings,
    configs: Arc<[BuildConfig]>,
    selector: BuilderSelector,
    resolver: PathResolver,
    store: MetaStore,
    graph: DependencyGraph,
    sources: BTreeMap<String, SourceState>,
    pending: PendingSet,
    build_permits: Arc<Semaphore>,
    done_tx: Sender<JobOutcome>,
    done_rx: Receiver<JobOutcome>,
    watcher: Option<DirWatcher>,
    watch_rx: Option<Receiver<Vec<WatchChange>>>,
    summary: BuildSummary,
    clean: bool,
    closed: bool,
}

impl Filer {
    pub fn new(options: FilerOptions) -> Self {
        let FilerOptions {
            fs,
            config,
            selector,
            clean,
        } = options;
        let ConfigFile {
            filer: settings,
            builds: configs,
        } = config;
        let resolver = PathResolver::new(Arc::clone(&fs), &settings);
        let store = MetaStore::new(Arc::clone(&fs), resolver.layout().meta_dir());
        let build_permits = Arc::new(Semaphore::new(settings.max_parallel));
        let (done_tx, done_rx) = tokio::sync::mpsc::channel(64);

        Self {
            fs,
            settings,
            configs: configs.into(),
            selector,
            resolver,
            store,
            graph: DependencyGraph::new(),
            sources: BTreeMap::new(),
            pending: PendingSet::new(),
            build_permits,
            done_tx,
            done_rx,
            watcher: None,
            watch_rx: None,
            summary: BuildSummary::default(),
            clean,
            closed: false,
        }
    }

    /// Brings the output tree up to date with the sources on disk and, in
    /// watch mode, leaves the OS watch running. Returns once every baseline
    /// build has finished.
    pub async fn init(&mut self) -> Result<BuildSummary> {
        let started = Instant::now();
        self.summary = BuildSummary::default();

        if self.clean {
            self.fs.empty_dir(self.resolver.layout().build_dir())?;
            info!(dir = %self.resolver.layout().build_dir().display(), "cleaned build dir");
        }
        self.fs.ensure_dir(&self.resolver.layout().meta_dir())?;
        for config in self.configs.iter() {
            self.fs
                .ensure_dir(&self.resolver.layout().config_root(&config.name))?;
        }

        // Sources deleted while the process was down still have meta records
        // and artifacts on disk; sweep them before the baseline pass.
        for id in self.store.load_all().into_keys() {
            if self.resolver.source_path(&id).is_none() {
                debug!(source = %id, "source vanished while offline");
                self.handle_delete(&id);
            }
        }

        let baseline = if self.settings.watch {
            let (mut dir_watcher, mut watch_rx) = DirWatcher::new(
                Arc::clone(&self.fs),
                self.resolver.source_dirs(),
                self.settings.debounce,
            );
            dir_watcher.init().await?;
            // The first message is always the baseline batch.
            let baseline = watch_rx.recv().await.unwrap_or_default();
            self.watcher = Some(dir_watcher);
            self.watch_rx = Some(watch_rx);
            baseline
        } else {
            for dir in self.resolver.source_dirs() {
                if !self.fs.exists(&dir) {
                    return Err(WatchmillError::ConfigError(format!(
                        "source dir does not exist: {}",
                        dir.display()
                    )));
                }
            }
            watcher::baseline_batch(&self.fs, &self.resolver.source_dirs())?
        };

        for change in baseline {
            self.dispatch(change);
        }
        self.drain().await;

        let summary = self.summary.clone();
        info!(
            built = summary.built,
            cache_hits = summary.cache_hits,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "initial build complete"
        );
        Ok(summary)
    }

    /// Consumes watch batches until the watcher goes away (via [`Filer::close`]
    /// or watch mode being off).
    pub async fn run(&mut self) -> Result<()> {
        let Some(mut watch_rx) = self.watch_rx.take() else {
            return Ok(());
        };
        info!("watching for changes");
        loop {
            tokio::select! {
                maybe_batch = watch_rx.recv() => match maybe_batch {
                    Some(batch) => {
                        for change in batch {
                            self.dispatch(change);
                        }
                    }
                    None => break,
                },
                maybe_outcome = self.done_rx.recv() => {
                    if let Some(outcome) = maybe_outcome {
                        self.apply_outcome(outcome);
                    }
                }
            }
        }
        Ok(())
    }

    /// Stops watching and waits for in-flight builds so meta records and
    /// artifacts land consistently. Safe to call more than once.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(mut dir_watcher) = self.watcher.take() {
            dir_watcher.close();
        }
        self.watch_rx = None;
        self.drain().await;
        info!("filer closed");
        Ok(())
    }

    /// Applies one change as if the watcher had delivered it and waits for
    /// the resulting builds, cascades included, to settle. Embedders driving
    /// the Filer without watch mode use this in place of [`Filer::run`].
    pub async fn apply_change(&mut self, change: WatchChange) {
        self.dispatch(change);
        self.drain().await;
    }

    pub fn watching(&self) -> bool {
        self.watch_rx.is_some()
    }

    pub fn summary(&self) -> BuildSummary {
        self.summary.clone()
    }

    async fn drain(&mut self) {
        while !self.pending.is_idle() {
            match self.done_rx.recv().await {
                Some(outcome) => self.apply_outcome(outcome),
                None => break,
            }
        }
    }

    fn dispatch(&mut self, change: WatchChange) {
        let Some(id) = self.resolver.source_id(&change.path) else {
            debug!(path = %change.path.display(), "change outside source dirs");
            return;
        };
        debug!(source = %id, kind = change.kind.as_str(), "change");
        match change.kind {
            ChangeKind::Delete => self.dispatch_action(id, PendingAction::Delete),
            ChangeKind::Init | ChangeKind::Create | ChangeKind::Update => self.dispatch_action(
                id,
                PendingAction::Build {
                    scope: BuildScope::All,
                    force: false,
                },
            ),
        }
    }

    fn dispatch_action(&mut self, id: String, action: PendingAction) {
        if self.closed {
            return;
        }
        if self.pending.is_inflight(&id) {
            self.pending.defer(&id, action);
            return;
        }
        match action {
            PendingAction::Delete => self.handle_delete(&id),
            PendingAction::Build { scope, force } => self.spawn_build(id, scope, force),
        }
    }

    /// Which configs a build of `id` covers. `All` means: configs whose
    /// filter accepts the file, plus configs it was previously built under,
    /// plus configs with an edge pointing at it. The latter two let
    /// dependency-pulled files rebuild even though no filter accepts them.
    fn configs_for(&self, id: &str, scope: &BuildScope) -> Vec<BuildConfig> {
        let names: BTreeSet<String> = match scope {
            BuildScope::Configs(names) => names.clone(),
            BuildScope::All => {
                let mut names: BTreeSet<String> = self
                    .configs
                    .iter()
                    .filter(|c| c.accepts(id))
                    .map(|c| c.name.clone())
                    .collect();
                if let Some(state) = self.sources.get(id) {
                    names.extend(state.outputs.keys().cloned());
                }
                names.extend(self.graph.dependent_configs_of(id));
                names
            }
        };
        self.configs
            .iter()
            .filter(|c| names.contains(&c.name))
            .cloned()
            .collect()
    }

    fn spawn_build(&mut self, id: String, scope: BuildScope, force: bool) {
        let configs = self.configs_for(&id, &scope);
        if configs.is_empty() {
            debug!(source = %id, "no build config wants this file");
            return;
        }
        let Some(path) = self.resolver.source_path(&id) else {
            // The file raced a delete between the event and now.
            self.handle_delete(&id);
            return;
        };

        self.pending.begin(&id);
        let build_job = BuildJob {
            source_id: id,
            path,
            configs,
            all_configs: Arc::clone(&self.configs),
            check_cache: !force,
            target: self.settings.target,
            source_map: self.settings.source_map.clone(),
            layout: self.resolver.layout().clone(),
            source_dirs: self.resolver.source_dirs(),
            store: self.store.clone(),
            fs: Arc::clone(&self.fs),
            selector: Arc::clone(&self.selector),
        };
        let done_tx = self.done_tx.clone();
        let permits = Arc::clone(&self.build_permits);
        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome = build_job.run().await;
            let _ = done_tx.send(outcome).await;
        });
    }

    fn apply_outcome(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::SourceGone { source_id } => {
                let followup = self.pending.finish(&source_id);
                self.handle_delete(&source_id);
                if let Some(next) = followup {
                    self.dispatch_action(source_id, next);
                }
            }
            JobOutcome::Completed {
                source_id,
                content_hash,
                results,
            } => {
                self.apply_completed(source_id, content_hash, results);
            }
        }
    }

    fn apply_completed(
        &mut self,
        source_id: String,
        content_hash: String,
        results: Vec<job::ConfigResult>,
    ) {
        let mut state = self.sources.remove(&source_id).unwrap_or_default();
        let loaded = self.store.load(&source_id);
        let mut meta_dirty = loaded
            .as_ref()
            .map(|m| m.content_hash != content_hash)
            .unwrap_or(true);
        let mut meta = loaded.unwrap_or_else(|| SourceMeta::new(content_hash.clone()));
        meta.content_hash = content_hash.clone();
        state.content_hash = content_hash;

        let mut changed_outputs: Vec<String> = Vec::new();
        let mut gc_candidates: BTreeSet<String> = BTreeSet::new();
        // dep id -> configs that want it built
        let mut wanted_deps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for result in results {
            let config = result.config;
            match result.kind {
                ConfigResultKind::CacheHit {
                    outputs,
                    dependencies,
                } => {
                    state.outputs.insert(config.clone(), outputs);
                    state.failed.remove(&config);
                    let removed = self.graph.set_edges(
                        &source_id,
                        &config,
                        dependencies
                            .iter()
                            .map(|d| (d.build_id.clone(), d.external)),
                    );
                    gc_candidates.extend(removed);
                    for dep in dependencies.iter().filter(|d| !d.external) {
                        wanted_deps
                            .entry(dep.build_id.clone())
                            .or_default()
                            .insert(config.clone());
                    }
                    self.summary.cache_hits += 1;
                }
                ConfigResultKind::Built {
                    outputs,
                    dependencies,
                } => {
                    let new_ids: Vec<String> =
                        outputs.iter().map(|o| o.build_id.clone()).collect();
                    if let Some(old_ids) = state.outputs.get(&config) {
                        for stale in old_ids.iter().filter(|o| !new_ids.contains(o)) {
                            let path = self.resolver.output_path(&config, stale);
                            if let Err(e) = self.fs.remove(&path) {
                                warn!(output = %stale, error = %e, "failed to remove stale output");
                            } else {
                                debug!(output = %stale, config = %config, "removed stale output");
                            }
                        }
                    }
                    state.outputs.insert(config.clone(), new_ids.clone());
                    state.failed.remove(&config);

                    meta.builds.insert(
                        config.clone(),
                        MetaBuild {
                            outputs: new_ids,
                            dependencies: dependencies
                                .iter()
                                .map(|d| d.to_serialized(&source_id))
                                .collect(),
                        },
                    );
                    meta_dirty = true;

                    let removed = self.graph.set_edges(
                        &source_id,
                        &config,
                        dependencies
                            .iter()
                            .map(|d| (d.build_id.clone(), d.external)),
                    );
                    gc_candidates.extend(removed);
                    for dep in dependencies.iter().filter(|d| !d.external) {
                        wanted_deps
                            .entry(dep.build_id.clone())
                            .or_default()
                            .insert(config.clone());
                    }
                    changed_outputs
                        .extend(outputs.into_iter().filter(|o| o.changed).map(|o| o.build_id));
                    self.summary.built += 1;
                }
                ConfigResultKind::Failed { .. } => {
                    // Prior artifacts and edges stay; dropping the meta entry
                    // guarantees the next event retries this config.
                    state.failed.insert(config.clone());
                    if meta.builds.remove(&config).is_some() {
                        meta_dirty = true;
                    }
                    self.summary.failed += 1;
                }
            }
        }

        if meta_dirty {
            if let Err(e) = self.store.save(&source_id, &meta) {
                warn!(source = %source_id, error = %e, "failed to save meta record");
            }
        }
        self.sources.insert(source_id.clone(), state);

        let mut visited = BTreeSet::from([source_id.clone()]);
        for dep in gc_candidates {
            self.collect_garbage(&dep, &mut visited);
        }

        for (dep_id, configs) in wanted_deps {
            let missing: BTreeSet<String> = configs
                .into_iter()
                .filter(|c| !self.is_built(&dep_id, c))
                .collect();
            if missing.is_empty() {
                continue;
            }
            if self.resolver.source_path(&dep_id).is_none() {
                warn!(source = %source_id, dependency = %dep_id, "missing dependency");
                continue;
            }
            self.dispatch_action(
                dep_id,
                PendingAction::Build {
                    scope: BuildScope::Configs(missing),
                    force: false,
                },
            );
        }

        let mut rebuilds: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for output in &changed_outputs {
            for (dependent, configs) in self.graph.dependents_of(output) {
                if dependent != source_id {
                    rebuilds.entry(dependent).or_default().extend(configs);
                }
            }
        }
        for (dependent, configs) in rebuilds {
            debug!(source = %dependent, "dependency changed, rebuilding");
            self.dispatch_action(
                dependent,
                PendingAction::Build {
                    scope: BuildScope::Configs(configs),
                    force: true,
                },
            );
        }

        if let Some(next) = self.pending.finish(&source_id) {
            self.dispatch_action(source_id, next);
        }
    }

    fn handle_delete(&mut self, id: &str) {
        let state = self.sources.remove(id);
        let meta = self.store.load(id);
        if state.is_none() && meta.is_none() {
            debug!(source = %id, "delete for unknown source");
            return;
        }

        let outputs: BTreeMap<String, Vec<String>> = match state {
            Some(state) => state.outputs,
            None => meta
                .map(|m| {
                    m.builds
                        .into_iter()
                        .map(|(config, build)| (config, build.outputs))
                        .collect()
                })
                .unwrap_or_default(),
        };

        for config_name in outputs.keys() {
            let Some(config) = self.configs.iter().find(|c| &c.name == config_name) else {
                continue;
            };
            let builder = (self.selector)(config, id);
            let ctx = BuildContext {
                fs: &self.fs,
                config,
                configs: &self.configs,
                target: self.settings.target,
                output_root: self.resolver.layout().build_dir(),
                source_map: &self.settings.source_map,
            };
            builder.on_remove(id, &ctx);
        }

        for (config, build_ids) in &outputs {
            for build_id in build_ids {
                let path = self.resolver.output_path(config, build_id);
                if let Err(e) = self.fs.remove(&path) {
                    warn!(output = %build_id, error = %e, "failed to remove output");
                }
            }
        }
        if let Err(e) = self.store.delete(id) {
            warn!(source = %id, error = %e, "failed to delete meta record");
        }

        let dropped = self.graph.remove_source(id);
        let mut visited = BTreeSet::from([id.to_string()]);
        for dep in dropped {
            self.collect_garbage(&dep, &mut visited);
        }

        let mut rebuilds: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for build_ids in outputs.values() {
            for build_id in build_ids {
                for (dependent, configs) in self.graph.dependents_of(build_id) {
                    if dependent != id {
                        rebuilds.entry(dependent).or_default().extend(configs);
                    }
                }
            }
        }
        for (dependent, configs) in rebuilds {
            debug!(source = %dependent, "dependency deleted, rebuilding");
            self.dispatch_action(
                dependent,
                PendingAction::Build {
                    scope: BuildScope::Configs(configs),
                    force: true,
                },
            );
        }

        self.summary.deleted += 1;
        info!(source = %id, "source removed");
    }

    /// Removes a dependency-pulled file that lost its last dependent, then
    /// walks its own dependencies the same way. The visited set keeps import
    /// cycles from looping.
    fn collect_garbage(&mut self, id: &str, visited: &mut BTreeSet<String>) {
        if !visited.insert(id.to_string()) {
            return;
        }
        if self.graph.has_dependents(id) || self.graph.is_external(id) {
            return;
        }
        if self.configs.iter().any(|c| c.accepts(id)) {
            // A root input; it stays even with no dependents.
            return;
        }
        let Some(state) = self.sources.remove(id) else {
            return;
        };
        debug!(source = %id, "garbage collecting orphaned dependency");
        for (config, build_ids) in &state.outputs {
            for build_id in build_ids {
                let path = self.resolver.output_path(config, build_id);
                if let Err(e) = self.fs.remove(&path) {
                    warn!(output = %build_id, error = %e, "failed to remove output");
                }
            }
        }
        if let Err(e) = self.store.delete(id) {
            warn!(source = %id, error = %e, "failed to delete meta record");
        }
        let dropped = self.graph.remove_source(id);
        for dep in dropped {
            self.collect_garbage(&dep, visited);
        }
    }

    fn is_built(&self, id: &str, config: &str) -> bool {
        self.sources
            .get(id)
            .is_some_and(|s| s.outputs.contains_key(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::default_selector;
    use crate::config::model::{SourceMap, Target};
    use crate::fs::mock::MockFileSystem;
    use crate::types::Platform;
    use crate::watch::filter::PathFilter;
    use std::collections::BTreeMap as Map;
    use std::path::PathBuf;
    use std::time::Duration;

    fn test_filer() -> Filer {
        let fs: Arc<dyn FileSystem> = Arc::new(MockFileSystem::new());
        let ts_filter = PathFilter::new(&["**/*.ts".to_string()], &[]).unwrap();
        let config = ConfigFile {
            filer: FilerSettings {
                source_dirs: vec![PathBuf::from("/proj/src")],
                build_dir: PathBuf::from("/proj/build"),
                debounce: Duration::from_millis(10),
                target: Target::Dev,
                watch: false,
                source_map: SourceMap::new(Map::new()),
                max_parallel: 4,
            },
            builds: vec![
                BuildConfig::new("browser", Platform::Browser, ts_filter.clone()),
                BuildConfig::new("node", Platform::Node, ts_filter),
            ],
        };
        Filer::new(FilerOptions {
            fs,
            config,
            selector: default_selector(),
            clean: false,
        })
    }

    #[tokio::test]
    async fn configs_for_all_scope_unions_filter_and_graph() {
        let mut filer = test_filer();

        // css matches no filter and has no edges: nothing wants it
        assert!(filer.configs_for("style.css", &BuildScope::All).is_empty());

        // once an edge points at it, the edge's config wants it
        filer
            .graph
            .set_edges("app.ts", "browser", [("style.css".to_string(), false)]);
        let configs = filer.configs_for("style.css", &BuildScope::All);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "browser");

        // ts files match both filters
        assert_eq!(filer.configs_for("app.ts", &BuildScope::All).len(), 2);
    }

    #[tokio::test]
    async fn configs_for_named_scope_ignores_stale_names() {
        let filer = test_filer();
        let scope = BuildScope::configs(["browser", "renamed-away"]);
        let configs = filer.configs_for("app.ts", &scope);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "browser");
    }

    #[tokio::test]
    async fn delete_of_unknown_source_is_a_no_op() {
        let mut filer = test_filer();
        filer.handle_delete("never-seen.ts");
        assert_eq!(filer.summary.deleted, 0);
    }

    #[tokio::test]
    async fn actions_defer_while_a_build_is_inflight() {
        let mut filer = test_filer();
        filer.pending.begin("app.ts");
        filer.dispatch_action(
            "app.ts".to_string(),
            PendingAction::Build {
                scope: BuildScope::All,
                force: false,
            },
        );
        let followup = filer.pending.finish("app.ts");
        assert_eq!(
            followup,
            Some(PendingAction::Build {
                scope: BuildScope::All,
                force: false,
            })
        );
    }
}
