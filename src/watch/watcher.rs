// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{Receiver, Sender, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::debounce::Debouncer;
use super::{ChangeKind, WatchChange};
use crate::errors::{Result, WatchmillError};
use crate::fs::FileSystem;

/// Watches a set of source directories and delivers debounced change batches.
///
/// `init` sends one baseline batch of [`ChangeKind::Init`] changes covering
/// every existing file, then streams coalesced create/update/delete batches
/// until `close` is called. `close` is idempotent.
pub struct DirWatcher {
    fs: Arc<dyn FileSystem>,
    dirs: Vec<PathBuf>,
    debounce: Duration,
    tx: Sender<Vec<WatchChange>>,
    watcher: Option<RecommendedWatcher>,
    task: Option<JoinHandle<()>>,
}

impl DirWatcher {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        dirs: Vec<PathBuf>,
        debounce: Duration,
    ) -> (Self, Receiver<Vec<WatchChange>>) {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        (
            Self {
                fs,
                dirs,
                debounce,
                tx,
                watcher: None,
                task: None,
            },
            rx,
        )
    }

    /// Starts the OS watch, emits the baseline batch, and spawns the debounce
    /// loop. The OS watch is registered before the baseline scan so changes
    /// racing the scan are not lost; the hash check downstream absorbs the
    /// occasional duplicate.
    pub async fn init(&mut self) -> Result<()> {
        let (raw_tx, raw_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        let _ = raw_tx.send(event);
                    }
                    Err(e) => warn!(error = %e, "watch backend error"),
                }
            })?;

        for dir in &self.dirs {
            if !self.fs.exists(dir) {
                return Err(WatchmillError::ConfigError(format!(
                    "source dir does not exist: {}",
                    dir.display()
                )));
            }
            watcher.watch(dir, RecursiveMode::Recursive)?;
            debug!(dir = %dir.display(), "watching");
        }

        let baseline = baseline_batch(&self.fs, &self.dirs)?;
        debug!(files = baseline.len(), "baseline scan complete");
        self.tx
            .send(baseline)
            .await
            .map_err(|_| WatchmillError::ConfigError("watch channel closed before init".into()))?;

        let task = tokio::spawn(debounce_loop(
            raw_rx,
            self.tx.clone(),
            self.debounce,
            Arc::clone(&self.fs),
        ));
        self.watcher = Some(watcher);
        self.task = Some(task);
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            debug!("watcher closed");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Scans `dirs` and returns one `Init` change per existing file, path-sorted
/// within each dir.
pub fn baseline_batch(fs: &Arc<dyn FileSystem>, dirs: &[PathBuf]) -> Result<Vec<WatchChange>> {
    let mut batch = Vec::new();
    for dir in dirs {
        for (path, stats) in fs.find_files(dir, None)? {
            if stats.is_file() {
                batch.push(WatchChange {
                    kind: ChangeKind::Init,
                    path,
                });
            }
        }
    }
    Ok(batch)
}

async fn debounce_loop(
    mut raw_rx: UnboundedReceiver<notify::Event>,
    tx: Sender<Vec<WatchChange>>,
    window: Duration,
    fs: Arc<dyn FileSystem>,
) {
    let mut debouncer = Debouncer::new();
    loop {
        if debouncer.is_empty() {
            match raw_rx.recv().await {
                Some(event) => record_event(&mut debouncer, event),
                None => break,
            }
        } else {
            // Trailing debounce: flush once the window passes with no events.
            match tokio::time::timeout(window, raw_rx.recv()).await {
                Ok(Some(event)) => record_event(&mut debouncer, event),
                Ok(None) => {
                    flush(&mut debouncer, &tx, &fs).await;
                    break;
                }
                Err(_) => flush(&mut debouncer, &tx, &fs).await,
            }
        }
    }
}

fn record_event(debouncer: &mut Debouncer, event: notify::Event) {
    match event.kind {
        EventKind::Create(_) => {
            for path in event.paths {
                debouncer.record(ChangeKind::Create, path);
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths {
                debouncer.record(ChangeKind::Delete, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in event.paths {
                debouncer.record(ChangeKind::Delete, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in event.paths {
                debouncer.record(ChangeKind::Create, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if let [from, to] = event.paths.as_slice() {
                debouncer.record(ChangeKind::Delete, from.clone());
                debouncer.record(ChangeKind::Create, to.clone());
            } else {
                for path in event.paths {
                    debouncer.record(ChangeKind::Update, path);
                }
            }
        }
        EventKind::Modify(_) => {
            for path in event.paths {
                debouncer.record(ChangeKind::Update, path);
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }
}

async fn flush(debouncer: &mut Debouncer, tx: &Sender<Vec<WatchChange>>, fs: &Arc<dyn FileSystem>) {
    let batch: Vec<WatchChange> = debouncer
        .take_batch()
        .into_iter()
        .filter(|change| match change.kind {
            ChangeKind::Delete => true,
            // Directory events and files deleted mid-window are dropped.
            _ => fs.stat(&change.path).map(|s| s.is_file()).unwrap_or(false),
        })
        .collect();
    if batch.is_empty() {
        return;
    }
    debug!(changes = batch.len(), "watch batch");
    let _ = tx.send(batch).await;
}
