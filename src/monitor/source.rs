//! Event sources feeding the monitor loop.
//!
//! The loop only needs two things from a source: wait for the next event and
//! drain whatever else is already queued. [`NotifySource`] provides that on
//! top of the platform watcher; [`ChannelSource`] lets callers inject events.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use walkdir::WalkDir;

use super::WatchError;

/// A raw notification for one entry of the watch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// An entry was created. Holds the name or path as delivered.
    Create(String),
    /// An entry was deleted. Holds the name or path as delivered.
    Delete(String),
    /// The notification queue overflowed and events were dropped.
    Overflow,
}

impl RawEvent {
    /// Translate a platform event into raw events.
    ///
    /// Only creations, deletions and queue overflows are of interest;
    /// modifications, renames and access events yield nothing.
    pub fn from_notify(event: Event) -> Vec<RawEvent> {
        if event.need_rescan() {
            return vec![RawEvent::Overflow];
        }

        let make: fn(String) -> RawEvent = match event.kind {
            EventKind::Create(_) => RawEvent::Create,
            EventKind::Remove(_) => RawEvent::Delete,
            _ => return Vec::new(),
        };

        event
            .paths
            .iter()
            .map(|p| make(p.to_string_lossy().into_owned()))
            .collect()
    }
}

/// One item from a source: an event, or an error the source hit while
/// producing it.
pub type SourceItem = Result<RawEvent, WatchError>;

/// A stream of raw events consumed by a single loop.
#[async_trait]
pub trait EventSource: Send {
    /// Wait until an item is available. `None` means the source is closed.
    async fn recv(&mut self) -> Option<SourceItem>;

    /// Take an already queued item without waiting.
    fn try_recv(&mut self) -> Option<SourceItem>;
}

/// Source backed by a tokio channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<SourceItem>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<SourceItem>) -> Self {
        Self { rx }
    }

    /// Create a source together with the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<SourceItem>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn recv(&mut self) -> Option<SourceItem> {
        self.rx.recv().await
    }

    fn try_recv(&mut self) -> Option<SourceItem> {
        self.rx.try_recv().ok()
    }
}

/// Source subscribed to create/delete events of one directory through
/// `notify::RecommendedWatcher` (inotify on Linux).
pub struct NotifySource {
    inner: ChannelSource,
    dir: PathBuf,
    /// The underlying file watcher (kept alive by storing it).
    _watcher: notify::RecommendedWatcher,
}

impl NotifySource {
    /// Start watching `dir`, non-recursively.
    ///
    /// `capacity` bounds the queue between the watcher thread and the loop;
    /// when it is full the watcher thread waits.
    pub fn subscribe(dir: &Path, capacity: usize) -> Result<Self, WatchError> {
        let (tx, inner) = ChannelSource::channel(capacity);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let items: Vec<SourceItem> = match res {
                Ok(event) => RawEvent::from_notify(event).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(WatchError::EventError {
                    details: e.to_string(),
                })],
            };
            for item in items {
                // Receiver gone means the monitor stopped
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
        })?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("monitor", "subscribed", "{}", dir.display());

        Ok(Self {
            inner,
            dir: dir.to_path_buf(),
            _watcher: watcher,
        })
    }

    /// The watched directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl EventSource for NotifySource {
    async fn recv(&mut self) -> Option<SourceItem> {
        self.inner.recv().await
    }

    fn try_recv(&mut self) -> Option<SourceItem> {
        self.inner.try_recv()
    }
}

/// Names of the entries directly inside `dir`, sorted.
///
/// Fails if `dir` is missing, is not a directory, or cannot be read.
pub fn list_directory(dir: &Path) -> Result<Vec<String>, WatchError> {
    let unreadable = |reason: String| WatchError::DirUnreadable {
        path: dir.to_path_buf(),
        reason,
    };

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| unreadable(e.to_string()))?;

        if entry.depth() == 0 {
            if !entry.file_type().is_dir() {
                return Err(unreadable("not a directory".to_string()));
            }
            continue;
        }

        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    Ok(names)
}
