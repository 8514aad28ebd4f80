//! Directory monitor: seeds the index, subscribes, and runs the event loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::WatchConfig;

use super::callback::{CallbackRegistry, FileCallback};
use super::error::WatchError;
use super::pattern::WatchPattern;
use super::reconciler::{EventReconciler, ReconcileStats};
use super::source::{EventSource, NotifySource, list_directory};

/// Final state returned when the monitor stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    /// Files tracked at shutdown.
    pub tracked: Vec<String>,
    /// Counters accumulated over the run.
    pub stats: ReconcileStats,
}

/// Watches one directory (non-recursively) for files matching a pattern.
///
/// Events are consumed by a single loop: wait for the next event, drain
/// everything already queued, reconcile it in arrival order, repeat.
pub struct FileMonitor {
    dir: PathBuf,
    pattern: WatchPattern,
    callbacks: Arc<CallbackRegistry>,
    channel_capacity: usize,
    tracked_tx: watch::Sender<Vec<String>>,
}

impl FileMonitor {
    /// Create a builder for configuring the monitor.
    pub fn builder() -> FileMonitorBuilder {
        FileMonitorBuilder::new()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pattern(&self) -> &WatchPattern {
        &self.pattern
    }

    /// Shared callback registry. Stays valid after [`run`](Self::run) takes
    /// the monitor, so callbacks can be added while it is running.
    pub fn callbacks(&self) -> Arc<CallbackRegistry> {
        self.callbacks.clone()
    }

    pub fn register_on_add(&self, callback: impl FileCallback + 'static) {
        self.callbacks.register_on_add(callback);
    }

    pub fn register_on_remove(&self, callback: impl FileCallback + 'static) {
        self.callbacks.register_on_remove(callback);
    }

    /// Snapshots of the tracked files, published after seeding and after
    /// every processed batch.
    pub fn tracked_files(&self) -> watch::Receiver<Vec<String>> {
        self.tracked_tx.subscribe()
    }

    /// Subscribe to the directory's create/delete events, seed the index
    /// from a listing, and process events until `cancel` fires.
    ///
    /// Only configuration problems (unreadable directory, failed
    /// subscription) are returned as errors.
    pub async fn run(self, cancel: CancellationToken) -> Result<MonitorReport, WatchError> {
        Ok(self.start()?.run(cancel).await)
    }

    /// Like [`run`](Self::run), with events taken from `source` instead of
    /// the platform watcher. Also stops when the source closes.
    pub async fn run_with_source<S: EventSource>(
        self,
        source: S,
        cancel: CancellationToken,
    ) -> Result<MonitorReport, WatchError> {
        Ok(self.start_with_source(source)?.run(cancel).await)
    }

    /// Subscribe and seed without consuming any event yet.
    ///
    /// The subscription is in place before the listing, so a file created
    /// during startup is either seeded or reported, never missed.
    pub fn start(self) -> Result<StartedMonitor<NotifySource>, WatchError> {
        let source = NotifySource::subscribe(&self.dir, self.channel_capacity)?;
        self.start_with_source(source)
    }

    /// Seed from the directory listing and pair the result with `source`.
    pub fn start_with_source<S: EventSource>(
        self,
        source: S,
    ) -> Result<StartedMonitor<S>, WatchError> {
        let reconciler = self.seed()?;
        Ok(StartedMonitor {
            monitor: self,
            reconciler,
            source,
        })
    }

    fn seed(&self) -> Result<EventReconciler, WatchError> {
        let names = list_directory(&self.dir)?;

        let mut reconciler = EventReconciler::new(self.pattern.clone(), self.callbacks.clone());
        let tracked = reconciler.seed(names);
        self.tracked_tx.send_replace(reconciler.index().snapshot());

        crate::log_event!(
            "monitor",
            "seeded",
            "{tracked} files matching '{}' in {}",
            self.pattern.as_str(),
            self.dir.display()
        );
        Ok(reconciler)
    }

    async fn consume<S: EventSource>(
        &self,
        mut reconciler: EventReconciler,
        mut source: S,
        cancel: CancellationToken,
    ) -> MonitorReport {
        let span = tracing::info_span!("monitor", dir = %self.dir.display());

        async {
            crate::log_event!("monitor", "started");

            loop {
                let first = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        crate::log_event!("monitor", "cancelled");
                        break;
                    }
                    item = source.recv() => item,
                };

                let Some(first) = first else {
                    crate::log_event!("monitor", "event source closed");
                    break;
                };

                let mut batch = 1usize;
                reconciler.handle(first);
                while let Some(item) = source.try_recv() {
                    reconciler.handle(item);
                    batch += 1;
                }

                crate::debug_event!("monitor", "batch processed", "{batch} events");
                self.tracked_tx.send_replace(reconciler.index().snapshot());
            }

            let stats = reconciler.stats();
            crate::log_event!(
                "monitor",
                "stopped",
                "{} added, {} removed, {} overflows, {} failed events, {} callback failures",
                stats.added,
                stats.removed,
                stats.overflows,
                stats.failed_events,
                stats.callback_failures
            );

            MonitorReport {
                tracked: reconciler.into_index().snapshot(),
                stats,
            }
        }
        .instrument(span)
        .await
    }
}

/// A monitor whose initial scan is done and whose loop has not started.
pub struct StartedMonitor<S> {
    monitor: FileMonitor,
    reconciler: EventReconciler,
    source: S,
}

impl<S: EventSource> StartedMonitor<S> {
    /// Files found by the initial scan.
    pub fn tracked(&self) -> Vec<String> {
        self.reconciler.index().snapshot()
    }

    /// Process events until `cancel` fires or the source closes.
    pub async fn run(self, cancel: CancellationToken) -> MonitorReport {
        let Self {
            monitor,
            reconciler,
            source,
        } = self;
        monitor.consume(reconciler, source, cancel).await
    }
}

impl std::fmt::Debug for FileMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMonitor")
            .field("dir", &self.dir)
            .field("pattern", &self.pattern)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

/// Builder for constructing a FileMonitor.
pub struct FileMonitorBuilder {
    dir: Option<PathBuf>,
    pattern: Option<String>,
    channel_capacity: usize,
    callbacks: CallbackRegistry,
}

impl FileMonitorBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            dir: None,
            pattern: None,
            channel_capacity: WatchConfig::default().channel_capacity,
            callbacks: CallbackRegistry::new(),
        }
    }

    /// Take directory, pattern and queue size from configuration.
    pub fn config(self, config: &WatchConfig) -> Self {
        self.watch_dir(config.dir.clone())
            .pattern(config.pattern.clone())
            .channel_capacity(config.channel_capacity)
    }

    /// Set the directory to watch.
    pub fn watch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Set the filename pattern (regex anchored at the start of the name).
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Set the event queue size between the watcher thread and the loop.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Add a callback for newly created matching files.
    pub fn on_add(self, callback: impl FileCallback + 'static) -> Self {
        self.callbacks.register_on_add(callback);
        self
    }

    /// Add a callback for deleted tracked files.
    pub fn on_remove(self, callback: impl FileCallback + 'static) -> Self {
        self.callbacks.register_on_remove(callback);
        self
    }

    /// Build the FileMonitor, validating pattern and directory.
    pub fn build(self) -> Result<FileMonitor, WatchError> {
        let dir = self.dir.ok_or_else(|| WatchError::InitFailed {
            reason: "Watch directory is required".to_string(),
        })?;

        let pattern = self.pattern.ok_or_else(|| WatchError::InitFailed {
            reason: "Watch pattern is required".to_string(),
        })?;
        let pattern = WatchPattern::new(&pattern)?;

        if !dir.is_dir() {
            return Err(WatchError::DirUnreadable {
                path: dir,
                reason: "not an existing directory".to_string(),
            });
        }

        let (tracked_tx, _) = watch::channel(Vec::new());

        Ok(FileMonitor {
            dir,
            pattern,
            callbacks: Arc::new(self.callbacks),
            channel_capacity: self.channel_capacity,
            tracked_tx,
        })
    }
}

impl Default for FileMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
