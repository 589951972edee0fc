use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use watchmill::build::{
    BuildContext, BuildDependency, BuildFile, Builder, BuilderSelector, SourceFile,
};
use watchmill::errors::{Result, WatchmillError};

/// A fake builder that:
/// - records every (source id, config) pair it was invoked for
/// - copies the source through as its single artifact
/// - reports whatever dependencies were scripted for the source id
/// - fails on demand for scripted source ids.
#[derive(Debug, Default)]
pub struct FakeBuilder {
    calls: Mutex<Vec<(String, String)>>,
    /// (source id, config name) -> scripted dependencies; "*" matches any config.
    deps: Mutex<BTreeMap<(String, String), Vec<BuildDependency>>>,
    /// (source id, config name) pairs that fail; "*" matches any config.
    failing: Mutex<BTreeSet<(String, String)>>,
    removed: Mutex<Vec<String>>,
}

impl FakeBuilder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the dependencies the next builds of `id` will report, in
    /// every config.
    pub fn set_deps(&self, id: &str, deps: Vec<BuildDependency>) {
        self.deps
            .lock()
            .unwrap()
            .insert((id.to_string(), "*".to_string()), deps);
    }

    /// Script dependencies for builds of `id` under `config` only.
    pub fn set_deps_in(&self, id: &str, config: &str, deps: Vec<BuildDependency>) {
        self.deps
            .lock()
            .unwrap()
            .insert((id.to_string(), config.to_string()), deps);
    }

    /// Make builds of `id` fail in every config until [`FakeBuilder::heal`]
    /// is called.
    pub fn fail(&self, id: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((id.to_string(), "*".to_string()));
    }

    /// Make builds of `id` fail only under `config`.
    pub fn fail_in(&self, id: &str, config: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert((id.to_string(), config.to_string()));
    }

    pub fn heal(&self, id: &str) {
        self.failing.lock().unwrap().retain(|(i, _)| i != id);
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// How many times `id` was built, across all configs.
    pub fn builds_of(&self, id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(source, _)| source == id)
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Source ids `on_remove` was invoked for, in order.
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

impl Builder for FakeBuilder {
    fn name(&self) -> &str {
        "fake"
    }

    fn build<'a>(
        &'a self,
        source: &'a SourceFile,
        ctx: &'a BuildContext<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<BuildFile>>> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((source.id.clone(), ctx.config.name.clone()));

            let fails = {
                let failing = self.failing.lock().unwrap();
                failing.contains(&(source.id.clone(), "*".to_string()))
                    || failing.contains(&(source.id.clone(), ctx.config.name.clone()))
            };
            if fails {
                return Err(WatchmillError::BuilderError {
                    builder: "fake".to_string(),
                    source: source.id.clone(),
                    build: ctx.config.name.clone(),
                    message: "scripted failure".to_string(),
                });
            }

            let deps = {
                let deps = self.deps.lock().unwrap();
                deps.get(&(source.id.clone(), ctx.config.name.clone()))
                    .or_else(|| deps.get(&(source.id.clone(), "*".to_string())))
                    .cloned()
                    .unwrap_or_default()
            };
            Ok(vec![BuildFile::with_dependencies(
                source.id.clone(),
                source.content.clone(),
                deps,
            )])
        })
    }

    fn on_remove(&self, source_id: &str, _ctx: &BuildContext<'_>) {
        self.removed.lock().unwrap().push(source_id.to_string());
    }
}

/// A selector that routes every file to the given fake builder.
pub fn fake_selector(builder: Arc<FakeBuilder>) -> BuilderSelector {
    Arc::new(move |_config, _source_id| Arc::clone(&builder) as Arc<dyn Builder>)
}
