// src/filer/graph.rs

use std::collections::{BTreeMap, BTreeSet};

/// The import graph: which build ids each (source, config) pair depends on,
/// plus the reverse index used for invalidation.
///
/// Nodes are plain id strings; cycles are legal (ES modules allow them), so
/// every walk over this graph carries a visited set instead of assuming a
/// DAG.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// source id -> config name -> dependency build ids
    forward: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    /// dependency build id -> source id -> config names
    reverse: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    /// build ids recorded as external leaves
    external: BTreeSet<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the edges of `(source_id, config)` with `deps`, returning the
    /// dependency ids that were dropped (stale edges).
    pub fn set_edges<I>(&mut self, source_id: &str, config: &str, deps: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        let mut new_ids = BTreeSet::new();
        for (dep_id, external) in deps {
            if external {
                self.external.insert(dep_id.clone());
            }
            new_ids.insert(dep_id);
        }

        let old_ids = self
            .forward
            .entry(source_id.to_string())
            .or_default()
            .insert(config.to_string(), new_ids.clone())
            .unwrap_or_default();

        let mut removed = Vec::new();
        for stale in old_ids.difference(&new_ids) {
            self.unlink(stale, source_id, config);
            removed.push(stale.clone());
        }
        for dep_id in &new_ids {
            self.reverse
                .entry(dep_id.clone())
                .or_default()
                .entry(source_id.to_string())
                .or_default()
                .insert(config.to_string());
        }
        removed
    }

    /// Drops every edge owned by `source_id`, returning the dependency ids it
    /// pointed at (candidates for garbage collection).
    pub fn remove_source(&mut self, source_id: &str) -> Vec<String> {
        let Some(configs) = self.forward.remove(source_id) else {
            return Vec::new();
        };
        let mut dropped = BTreeSet::new();
        for (config, dep_ids) in configs {
            for dep_id in dep_ids {
                self.unlink(&dep_id, source_id, &config);
                dropped.insert(dep_id);
            }
        }
        dropped.into_iter().collect()
    }

    /// Sources that depend on `dep_id`, with the configs each edge belongs to.
    pub fn dependents_of(&self, dep_id: &str) -> Vec<(String, BTreeSet<String>)> {
        self.reverse
            .get(dep_id)
            .map(|sources| {
                sources
                    .iter()
                    .map(|(source, configs)| (source.clone(), configs.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_dependents(&self, dep_id: &str) -> bool {
        self.reverse.contains_key(dep_id)
    }

    /// Union of configs across every edge pointing at `dep_id`.
    pub fn dependent_configs_of(&self, dep_id: &str) -> BTreeSet<String> {
        self.reverse
            .get(dep_id)
            .map(|sources| {
                sources
                    .values()
                    .flat_map(|configs| configs.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn dependencies_of(&self, source_id: &str, config: &str) -> BTreeSet<String> {
        self.forward
            .get(source_id)
            .and_then(|configs| configs.get(config))
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_external(&self, id: &str) -> bool {
        self.external.contains(id)
    }

    fn unlink(&mut self, dep_id: &str, source_id: &str, config: &str) {
        let mut drop_dep = false;
        if let Some(sources) = self.reverse.get_mut(dep_id) {
            if let Some(configs) = sources.get_mut(source_id) {
                configs.remove(config);
                if configs.is_empty() {
                    sources.remove(source_id);
                }
            }
            drop_dep = sources.is_empty();
        }
        if drop_dep {
            self.reverse.remove(dep_id);
            self.external.remove(dep_id);
        }
    }
}
