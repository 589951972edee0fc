// src/watch/mod.rs

//! Directory watching: glob filters, event debouncing, and the notify-backed
//! watcher that feeds change batches to the Filer.

pub mod debounce;
pub mod filter;
pub mod watcher;

use std::path::PathBuf;

pub use debounce::Debouncer;
pub use filter::PathFilter;
pub use watcher::DirWatcher;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Seen during the baseline scan at startup.
    Init,
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Init => "init",
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A single debounced filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
}
