//! File Watcher (C9): subscribes to filesystem events, filters them
//! through the language registry and discovery rules, coalesces a batch
//! of dirty paths behind a debounce timer, and hands the batch to the
//! Analysis Engine's incremental path. The watcher never touches the
//! graph itself — `notify`'s callback thread only ever posts onto an
//! unbounded channel; the debounce timer and the call into
//! `AnalysisEngine::analyze_incremental` run on a dedicated tokio task.

use codegraph_index::coordinator::AnalysisEngine;
use codegraph_index::discovery::Discovery;
use codegraph_index::registry;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One accepted filesystem change, already path-normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

fn convert(event: notify::Event) -> Vec<WatchEvent> {
    use notify::event::{ModifyKind, RenameMode};
    match event.kind {
        notify::EventKind::Create(_) => event.paths.into_iter().map(WatchEvent::Created).collect(),
        // A rename/move is reported as a single event carrying both the old
        // and new path; it's modeled as a (delete old, create new) pair per
        // the coalescing contract rather than a third event variant.
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            vec![WatchEvent::Removed(event.paths[0].clone()), WatchEvent::Created(event.paths[1].clone())]
        }
        notify::EventKind::Modify(_) => event.paths.into_iter().map(WatchEvent::Modified).collect(),
        notify::EventKind::Remove(_) => event.paths.into_iter().map(WatchEvent::Removed).collect(),
        _ => Vec::new(),
    }
}

/// Path this event concerns, regardless of kind.
fn event_path(event: &WatchEvent) -> &Path {
    match event {
        WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
    }
}

/// Apply the C2/C1 filter: ignored paths are dropped outright; removals
/// are always forwarded (the path no longer exists, so "is this language
/// supported" can't be answered from the path alone and the coordinator's
/// delete handling is itself a no-op for anything it doesn't recognize).
fn accept(discovery: &Discovery, event: &WatchEvent) -> Option<PathBuf> {
    let path = event_path(event);
    if discovery.is_ignored(path) {
        return None;
    }
    match event {
        WatchEvent::Removed(_) => Some(path.to_path_buf()),
        _ => registry::is_supported(path).then(|| path.to_path_buf()),
    }
}

/// Debounced filesystem watcher service wired to one `AnalysisEngine`.
pub struct WatcherService {
    root: PathBuf,
    engine: Arc<AnalysisEngine>,
    discovery: Discovery,
    debounce: Duration,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<WatcherHandle>>,
}

/// Live state held only while the watcher is running; dropping it (via
/// `stop`) tears down the notify watcher and cancels the debounce task.
struct WatcherHandle {
    _fs_watcher: RecommendedWatcher,
    cancel: oneshot::Sender<()>,
}

impl WatcherService {
    pub fn new(root: impl Into<PathBuf>, engine: Arc<AnalysisEngine>, discovery: Discovery, debounce: Duration) -> Self {
        WatcherService {
            root: root.into(),
            engine,
            discovery,
            debounce,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Idempotent: calling `start` while already running is a no-op.
    pub fn start(&self) -> anyhow::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Event>();
        let mut fs_watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let _ = raw_tx.send(event);
                }
                Err(e) => tracing::warn!(error = %e, "filesystem watch error"),
            }
        })?;
        fs_watcher.watch(&self.root, RecursiveMode::Recursive)?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let engine = self.engine.clone();
        let discovery = self.discovery.clone();
        let debounce = self.debounce;
        let running = self.running.clone();

        tokio::spawn(async move {
            run_debounce_loop(raw_rx, cancel_rx, engine, discovery, debounce).await;
            running.store(false, Ordering::SeqCst);
        });

        *self.handle.lock().unwrap() = Some(WatcherHandle { _fs_watcher: fs_watcher, cancel: cancel_tx });
        Ok(())
    }

    /// Cancels the debounce timer and discards the notify watcher; any
    /// events already queued on the channel are dropped without being
    /// analyzed once the loop observes the cancellation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.cancel.send(());
        }
    }
}

async fn run_debounce_loop(
    mut raw_rx: mpsc::UnboundedReceiver<notify::Event>,
    mut cancel_rx: oneshot::Receiver<()>,
    engine: Arc<AnalysisEngine>,
    discovery: Discovery,
    debounce: Duration,
) {
    let mut dirty: HashSet<PathBuf> = HashSet::new();

    loop {
        if dirty.is_empty() {
            tokio::select! {
                _ = &mut cancel_rx => return,
                maybe_event = raw_rx.recv() => {
                    match maybe_event {
                        None => return,
                        Some(event) => insert_accepted(&discovery, event, &mut dirty),
                    }
                }
            }
        } else {
            tokio::select! {
                _ = &mut cancel_rx => return,
                _ = tokio::time::sleep(debounce) => {
                    let batch: Vec<PathBuf> = dirty.drain().collect();
                    if let Err(e) = engine.analyze_incremental(&batch).await {
                        tracing::warn!(error = %e, "incremental analysis failed for watcher batch");
                    }
                }
                maybe_event = raw_rx.recv() => {
                    match maybe_event {
                        None => return,
                        Some(event) => insert_accepted(&discovery, event, &mut dirty),
                    }
                }
            }
        }
    }
}

fn insert_accepted(discovery: &Discovery, event: notify::Event, dirty: &mut HashSet<PathBuf>) {
    for watch_event in convert(event) {
        if let Some(path) = accept(discovery, &watch_event) {
            dirty.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{Cache, CacheConfig};
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn rename_converts_to_delete_then_create() {
        let event = notify::Event {
            kind: notify::EventKind::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::Both)),
            paths: vec![PathBuf::from("old.rs"), PathBuf::from("new.rs")],
            attrs: Default::default(),
        };
        let events = convert(event);
        assert_eq!(events, vec![WatchEvent::Removed(PathBuf::from("old.rs")), WatchEvent::Created(PathBuf::from("new.rs"))]);
    }

    #[test]
    fn accept_drops_ignored_and_unsupported_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "skip/\n").unwrap();
        fs::create_dir_all(dir.path().join("skip")).unwrap();
        let discovery = Discovery::new(dir.path());

        let ignored = WatchEvent::Modified(dir.path().join("skip/file.rs"));
        assert!(accept(&discovery, &ignored).is_none());

        let unsupported = WatchEvent::Modified(dir.path().join("README.md"));
        assert!(accept(&discovery, &unsupported).is_none());

        let accepted = WatchEvent::Modified(dir.path().join("main.rs"));
        assert_eq!(accept(&discovery, &accepted), Some(dir.path().join("main.rs")));
    }

    #[test]
    fn accept_always_forwards_removals() {
        let dir = TempDir::new().unwrap();
        let discovery = Discovery::new(dir.path());
        let removed = WatchEvent::Removed(dir.path().join("gone.rs"));
        assert_eq!(accept(&discovery, &removed), Some(dir.path().join("gone.rs")));
    }

    #[tokio::test]
    async fn debounce_loop_coalesces_rapid_events_into_one_batch() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("a.py");
        fs::write(&file_path, "def foo():\n    return 1\n").unwrap();

        let cache = Cache::connect(CacheConfig { redis_url: None, ..Default::default() }).await.unwrap();
        let engine = Arc::new(AnalysisEngine::new(dir.path(), Discovery::new(dir.path()), cache));

        let (raw_tx, raw_rx) = unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        for _ in 0..50 {
            raw_tx
                .send(notify::Event {
                    kind: notify::EventKind::Modify(notify::event::ModifyKind::Data(notify::event::DataChange::Content)),
                    paths: vec![file_path.clone()],
                    attrs: Default::default(),
                })
                .unwrap();
        }
        drop(raw_tx);

        let loop_engine = engine.clone();
        let discovery = Discovery::new(dir.path());
        let task = tokio::spawn(async move {
            run_debounce_loop(raw_rx, cancel_rx, loop_engine, discovery, Duration::from_millis(50)).await;
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        let _ = cancel_tx.send(());
        task.await.unwrap();

        assert!(engine.graph().await.find_node_by_name("foo").is_some());
    }
}
