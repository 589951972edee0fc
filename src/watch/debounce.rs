// src/watch/debounce.rs

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::PathBuf;

use super::{ChangeKind, WatchChange};

/// Coalesces raw filesystem events per path until the batch is drained.
///
/// Editors routinely emit create+write+rename storms for a single save; the
/// merge rules collapse each storm into the one change the Filer should act
/// on. A create followed by a delete inside the same window cancels out.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: BTreeMap<PathBuf, ChangeKind>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ChangeKind, path: PathBuf) {
        match self.pending.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(kind);
            }
            Entry::Occupied(mut slot) => match merge(*slot.get(), kind) {
                Some(merged) => {
                    slot.insert(merged);
                }
                None => {
                    slot.remove();
                }
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains pending changes in path order.
    pub fn take_batch(&mut self) -> Vec<WatchChange> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(path, kind)| WatchChange { kind, path })
            .collect()
    }
}

fn merge(prev: ChangeKind, next: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::*;
    match (prev, next) {
        (Create, Delete) => None,
        (Create, _) => Some(Create),
        (Delete, Delete) => Some(Delete),
        // Deleted then recreated within the window: net effect is an update.
        (Delete, _) => Some(Update),
        (_, Delete) => Some(Delete),
        (_, _) => Some(Update),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn create_then_update_stays_create() {
        let mut d = Debouncer::new();
        d.record(ChangeKind::Create, p("a.ts"));
        d.record(ChangeKind::Update, p("a.ts"));
        let batch = d.take_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].kind, ChangeKind::Create);
    }

    #[test]
    fn create_then_delete_cancels_out() {
        let mut d = Debouncer::new();
        d.record(ChangeKind::Create, p("a.ts"));
        d.record(ChangeKind::Delete, p("a.ts"));
        assert!(d.is_empty());
        assert!(d.take_batch().is_empty());
    }

    #[test]
    fn update_then_delete_becomes_delete() {
        let mut d = Debouncer::new();
        d.record(ChangeKind::Update, p("a.ts"));
        d.record(ChangeKind::Delete, p("a.ts"));
        assert_eq!(d.take_batch()[0].kind, ChangeKind::Delete);
    }

    #[test]
    fn delete_then_create_becomes_update() {
        let mut d = Debouncer::new();
        d.record(ChangeKind::Delete, p("a.ts"));
        d.record(ChangeKind::Create, p("a.ts"));
        assert_eq!(d.take_batch()[0].kind, ChangeKind::Update);
    }

    #[test]
    fn batch_is_sorted_by_path_and_drains() {
        let mut d = Debouncer::new();
        d.record(ChangeKind::Update, p("z.ts"));
        d.record(ChangeKind::Update, p("a.ts"));
        d.record(ChangeKind::Create, p("m.ts"));
        let batch = d.take_batch();
        let paths: Vec<&Path> = batch.iter().map(|c| c.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("a.ts"), Path::new("m.ts"), Path::new("z.ts")]);
        assert!(d.is_empty());
    }

    #[test]
    fn distinct_paths_do_not_merge() {
        let mut d = Debouncer::new();
        d.record(ChangeKind::Create, p("a.ts"));
        d.record(ChangeKind::Delete, p("b.ts"));
        assert_eq!(d.take_batch().len(), 2);
    }
}
