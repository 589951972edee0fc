// src/filer/pending.rs

use std::collections::{BTreeMap, BTreeSet};

/// Which build configs a queued action covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildScope {
    All,
    Configs(BTreeSet<String>),
}

impl BuildScope {
    pub fn configs<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Configs(names.into_iter().map(Into::into).collect())
    }

    pub fn union(self, other: BuildScope) -> BuildScope {
        match (self, other) {
            (BuildScope::Configs(mut a), BuildScope::Configs(b)) => {
                a.extend(b);
                BuildScope::Configs(a)
            }
            _ => BuildScope::All,
        }
    }
}

/// Work queued for a source id.
///
/// `force` bypasses the cache check; set when a dependency changed, since the
/// dependent's own content hash is unchanged in that case and the refreshed
/// dependency meta would make the cache check pass wrongly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Build { scope: BuildScope, force: bool },
    Delete,
}

impl PendingAction {
    /// Coalesces `next` into `self`, latest-wins. A build after a queued
    /// delete means the file reappeared, so the whole id rebuilds.
    pub fn merge(self, next: PendingAction) -> PendingAction {
        match (self, next) {
            (_, PendingAction::Delete) => PendingAction::Delete,
            (PendingAction::Delete, PendingAction::Build { .. }) => PendingAction::Build {
                scope: BuildScope::All,
                force: true,
            },
            (
                PendingAction::Build { scope: a, force: fa },
                PendingAction::Build { scope: b, force: fb },
            ) => PendingAction::Build {
                scope: a.union(b),
                force: fa || fb,
            },
        }
    }
}

/// Tracks which source ids have a build in flight and holds at most one
/// coalesced follow-up action per id. This is what serializes builds per id
/// while leaving different ids free to run concurrently.
#[derive(Debug, Default)]
pub struct PendingSet {
    inflight: BTreeSet<String>,
    queued: BTreeMap<String, PendingAction>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_inflight(&self, id: &str) -> bool {
        self.inflight.contains(id)
    }

    /// Marks `id` in flight. Returns `false` if it already was.
    pub fn begin(&mut self, id: &str) -> bool {
        self.inflight.insert(id.to_string())
    }

    /// Queues `action` behind the in-flight build, merging with whatever is
    /// already queued.
    pub fn defer(&mut self, id: &str, action: PendingAction) {
        match self.queued.remove(id) {
            Some(existing) => {
                self.queued.insert(id.to_string(), existing.merge(action));
            }
            None => {
                self.queued.insert(id.to_string(), action);
            }
        }
    }

    /// Clears the in-flight mark and hands back the queued follow-up, if any.
    pub fn finish(&mut self, id: &str) -> Option<PendingAction> {
        self.inflight.remove(id);
        self.queued.remove(id)
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.inflight.is_empty()
    }
}
