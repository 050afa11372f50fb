//! Hot reload: watches the project template tree and invalidates cache entries.
//!
//! Editors tend to produce bursts of events for one save (truncate, write,
//! rename-over, chmod). Events are mapped to template keys and collected in a
//! pending set; every event pushes the flush deadline out by the debounce
//! window. Once the tree has been quiet for that long, the set is swapped out
//! and each key is handed to the [`Invalidate`] target.
//!
//! ```text
//! Idle ──change──> Pending(deadline) ──change──> Pending(deadline reset)
//!   ^                                                  │
//!   └──────────── Flushing <──── deadline reached ─────┘
//! ```
//!
//! The watcher is a development aid. It never fails its caller: a disabled
//! configuration, a missing root, a missing runtime or an OS watch error all
//! leave an inert watcher behind and log why.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::cache::TemplateCache;
use super::engine::CompiledTemplate;
use super::key::TemplateKey;

/// Target of flushed invalidations.
///
/// The watcher only ever talks to the cache through this seam.
pub trait Invalidate: Send + Sync {
    fn invalidate(&self, key: &TemplateKey);
}

impl Invalidate for TemplateCache<CompiledTemplate> {
    fn invalidate(&self, key: &TemplateKey) {
        TemplateCache::invalidate(self, key);
        let dependents = self.invalidate_dependents(key);
        if !dependents.is_empty() {
            tracing::debug!(template = %key, dependents = dependents.len(), "Invalidated dependent templates");
        }
    }
}

/// Keys changed since the last flush.
#[derive(Debug, Default)]
struct PendingInvalidations {
    keys: Mutex<HashSet<TemplateKey>>,
}

impl PendingInvalidations {
    fn add(&self, keys: impl IntoIterator<Item = TemplateKey>) {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).extend(keys);
    }

    fn take(&self) -> HashSet<TemplateKey> {
        std::mem::take(&mut *self.keys.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Feeds changed keys into a running watcher.
///
/// The OS backend uses one internally; [`TemplateWatcher::with_sink`] hands
/// one out so other change sources can drive the same debounce.
#[derive(Debug, Clone)]
pub struct ChangeSink {
    pending: Arc<PendingInvalidations>,
    notify: mpsc::UnboundedSender<()>,
}

impl ChangeSink {
    /// Record changed keys and restart the debounce window.
    ///
    /// Every call restarts the window, even if all keys were already pending.
    pub fn push(&self, keys: impl IntoIterator<Item = TemplateKey>) {
        self.pending.add(keys);
        // Receiver gone means the watcher was shut down
        let _ = self.notify.send(());
    }
}

struct Running {
    root: PathBuf,
    // Dropping the backend stops OS event delivery
    backend: Option<RecommendedWatcher>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Handle to the background watcher task.
///
/// Inert handles (hot reload disabled, nothing to watch) support the same
/// API and do nothing.
pub struct TemplateWatcher {
    running: Option<Running>,
}

impl std::fmt::Debug for TemplateWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateWatcher")
            .field("root", &self.root())
            .field("active", &self.is_active())
            .finish()
    }
}

impl TemplateWatcher {
    /// A watcher that does nothing.
    pub fn inert() -> Self {
        Self { running: None }
    }

    /// Start watching `root` for changes to `*.{extension}` files.
    ///
    /// Returns an inert watcher when `enabled` is false, when `root` is not a
    /// directory, when called outside a Tokio runtime, or when the OS watcher
    /// cannot be set up.
    pub fn start(
        root: &Path,
        extension: &str,
        debounce: Duration,
        enabled: bool,
        target: Arc<dyn Invalidate>,
    ) -> Self {
        if !enabled {
            tracing::debug!("Hot reload disabled, template watcher not started");
            return Self::inert();
        }

        if !root.is_dir() {
            tracing::warn!(
                path = %root.display(),
                "Template directory does not exist, hot reload is inactive"
            );
            return Self::inert();
        }

        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!("No Tokio runtime available, hot reload is inactive");
            return Self::inert();
        }

        // Event paths are reported relative to the canonical root
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let (sink, shutdown, task) = spawn_debouncer(debounce, target);

        let callback_root = root.clone();
        let callback_extension = extension.to_string();
        let backend = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let keys = keys_for_event(&callback_root, &callback_extension, &event);
                if !keys.is_empty() {
                    sink.push(keys);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Template watch error");
            }
        });

        let backend = match backend.and_then(|mut watcher| {
            watcher.watch(&root, RecursiveMode::Recursive)?;
            Ok(watcher)
        }) {
            Ok(watcher) => watcher,
            Err(e) => {
                tracing::warn!(
                    path = %root.display(),
                    error = %e,
                    "Failed to watch template directory, hot reload is inactive"
                );
                let _ = shutdown.send(());
                return Self::inert();
            }
        };

        tracing::info!(
            path = %root.display(),
            debounce_ms = debounce.as_millis() as u64,
            "Started template watcher"
        );

        Self {
            running: Some(Running {
                root,
                backend: Some(backend),
                shutdown,
                task,
            }),
        }
    }

    /// A watcher fed by hand instead of by the filesystem.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_sink(debounce: Duration, target: Arc<dyn Invalidate>) -> (Self, ChangeSink) {
        let (sink, shutdown, task) = spawn_debouncer(debounce, target);
        let watcher = Self {
            running: Some(Running {
                root: PathBuf::new(),
                backend: None,
                shutdown,
                task,
            }),
        };
        (watcher, sink)
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    /// Watched root, if active and backed by the filesystem.
    pub fn root(&self) -> Option<&Path> {
        self.running
            .as_ref()
            .filter(|running| running.backend.is_some())
            .map(|running| running.root.as_path())
    }

    /// Stop observing and discard any pending, unflushed changes.
    ///
    /// Idempotent.
    pub async fn shutdown(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };

        drop(running.backend.take());
        let _ = running.shutdown.send(());
        if let Err(e) = running.task.await {
            tracing::debug!(error = %e, "Template watcher task ended abnormally");
        }
        tracing::info!("Stopped template watcher");
    }
}

impl Drop for TemplateWatcher {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            drop(running.backend.take());
            let _ = running.shutdown.send(());
        }
    }
}

fn spawn_debouncer(
    debounce: Duration,
    target: Arc<dyn Invalidate>,
) -> (ChangeSink, oneshot::Sender<()>, JoinHandle<()>) {
    let pending = Arc::new(PendingInvalidations::default());
    let (notify_tx, notify_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = tokio::spawn(debounce_loop(
        Arc::clone(&pending),
        notify_rx,
        shutdown_rx,
        debounce,
        target,
    ));

    let sink = ChangeSink {
        pending,
        notify: notify_tx,
    };
    (sink, shutdown_tx, task)
}

async fn debounce_loop(
    pending: Arc<PendingInvalidations>,
    mut changes: mpsc::UnboundedReceiver<()>,
    mut shutdown: oneshot::Receiver<()>,
    debounce: Duration,
    target: Arc<dyn Invalidate>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let flush_at = deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            change = changes.recv() => match change {
                Some(()) => deadline = Some(Instant::now() + debounce),
                None => break,
            },

            _ = tokio::time::sleep_until(flush_at), if deadline.is_some() => {
                deadline = None;
                flush(&pending, target.as_ref());
            }
        }
    }
}

fn flush(pending: &PendingInvalidations, target: &dyn Invalidate) {
    let keys = pending.take();
    if keys.is_empty() {
        return;
    }

    let mut keys: Vec<_> = keys.into_iter().collect();
    keys.sort();
    for key in &keys {
        tracing::debug!(template = %key, "Template changed, invalidating");
        target.invalidate(key);
    }
}

/// Template keys affected by a filesystem event.
///
/// Renames report both the old and the new path, so both keys are returned.
fn keys_for_event(root: &Path, extension: &str, event: &Event) -> Vec<TemplateKey> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any => {}
        EventKind::Access(_) | EventKind::Other => return Vec::new(),
    }

    event
        .paths
        .iter()
        .filter_map(|path| key_for_path(root, path, extension))
        .collect()
}

/// Map an absolute path under `root` to its template key.
pub fn key_for_path(root: &Path, path: &Path, extension: &str) -> Option<TemplateKey> {
    let relative = path.strip_prefix(root).ok()?;
    TemplateKey::from_relative_path(relative, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RenameMode};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<TemplateKey>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<TemplateKey> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Invalidate for Recorder {
        fn invalidate(&self, key: &TemplateKey) {
            self.calls.lock().unwrap().push(key.clone());
        }
    }

    const DEBOUNCE: Duration = Duration::from_millis(50);

    #[test]
    fn test_key_for_path() {
        let root = Path::new("/srv/app/Templates");
        assert_eq!(
            key_for_path(root, &root.join("pages").join("home.html"), "html"),
            Some(TemplateKey::from("pages/home"))
        );
        assert_eq!(key_for_path(root, &root.join("pages").join("home.swp"), "html"), None);
        assert_eq!(key_for_path(root, Path::new("/elsewhere/x.html"), "html"), None);
    }

    #[test]
    fn test_rename_yields_both_keys() {
        let root = Path::new("/t");
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(root.join("pages/old.html"))
            .add_path(root.join("pages/new.html"));

        assert_eq!(
            keys_for_event(root, "html", &event),
            vec![TemplateKey::from("pages/old"), TemplateKey::from("pages/new")]
        );
    }

    #[test]
    fn test_access_events_are_ignored() {
        let root = Path::new("/t");
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(root.join("a.html"));
        assert!(keys_for_event(root, "html", &event).is_empty());

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(root.join("a.html"));
        assert_eq!(keys_for_event(root, "html", &created), vec![TemplateKey::from("a")]);
    }

    #[test]
    fn test_pending_keys_are_deduplicated_until_taken() {
        let pending = PendingInvalidations::default();
        pending.add([TemplateKey::from("a"), TemplateKey::from("b")]);
        pending.add([TemplateKey::from("a")]);

        assert_eq!(pending.take().len(), 2);
        assert!(pending.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced_into_one_invalidation() {
        let recorder = Arc::new(Recorder::default());
        let (_watcher, sink) = TemplateWatcher::with_sink(DEBOUNCE, recorder.clone());

        for _ in 0..5 {
            sink.push([TemplateKey::from("pages/a")]);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(recorder.calls().is_empty(), "flushed before the window closed");

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(recorder.calls(), vec![TemplateKey::from("pages/a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separated_changes_flush_separately() {
        let recorder = Arc::new(Recorder::default());
        let (_watcher, sink) = TemplateWatcher::with_sink(DEBOUNCE, recorder.clone());

        sink.push([TemplateKey::from("pages/a")]);
        tokio::time::sleep(DEBOUNCE * 2).await;
        sink.push([TemplateKey::from("pages/a")]);
        tokio::time::sleep(DEBOUNCE * 2).await;

        assert_eq!(recorder.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_flush_together() {
        let recorder = Arc::new(Recorder::default());
        let (_watcher, sink) = TemplateWatcher::with_sink(DEBOUNCE, recorder.clone());

        sink.push([TemplateKey::from("pages/b"), TemplateKey::from("pages/a")]);
        sink.push([TemplateKey::from("pages/a")]);
        tokio::time::sleep(DEBOUNCE * 2).await;

        assert_eq!(
            recorder.calls(),
            vec![TemplateKey::from("pages/a"), TemplateKey::from("pages/b")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_pending_and_is_idempotent() {
        let recorder = Arc::new(Recorder::default());
        let (mut watcher, sink) = TemplateWatcher::with_sink(DEBOUNCE, recorder.clone());

        sink.push([TemplateKey::from("pages/a")]);
        watcher.shutdown().await;
        watcher.shutdown().await;
        assert!(!watcher.is_active());

        tokio::time::sleep(DEBOUNCE * 2).await;
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_or_missing_root_is_inert() {
        let recorder: Arc<dyn Invalidate> = Arc::new(Recorder::default());
        let temp = tempfile::TempDir::new().unwrap();

        let disabled = TemplateWatcher::start(temp.path(), "html", DEBOUNCE, false, recorder.clone());
        assert!(!disabled.is_active());

        let missing =
            TemplateWatcher::start(&temp.path().join("nope"), "html", DEBOUNCE, true, recorder);
        assert!(!missing.is_active());
        assert!(missing.root().is_none());
    }
}
