//! Event reconciliation: raw events in, index updates and callbacks out.
//!
//! Each filename is either tracked (present) or not. A create for an
//! untracked, matching name runs the add callbacks and then starts tracking
//! it; a delete for a tracked name runs the remove callbacks and then stops
//! tracking it. Everything else is dropped without side effects.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::WatchError;
use super::callback::{CallbackRegistry, Dispatch, panic_message};
use super::index::TrackedIndex;
use super::pattern::{WatchPattern, basename};
use super::source::{RawEvent, SourceItem};

/// What reconciling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Add callbacks ran and the file is now tracked.
    Added,
    /// Remove callbacks ran and the file is no longer tracked.
    Removed,
    /// Create for a file that is already tracked.
    Duplicate,
    /// Delete for a file that is not tracked.
    Untracked,
    /// Name did not match the watch pattern.
    Unmatched,
    /// The source reported dropped events.
    Overflow,
    /// The event could not be processed.
    Failed,
}

/// Running counters, reported when the monitor stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: u64,
    pub removed: u64,
    pub duplicates: u64,
    pub untracked: u64,
    pub unmatched: u64,
    pub overflows: u64,
    pub failed_events: u64,
    pub callback_failures: u64,
}

impl ReconcileStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Added => self.added += 1,
            Outcome::Removed => self.removed += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Untracked => self.untracked += 1,
            Outcome::Unmatched => self.unmatched += 1,
            Outcome::Overflow => self.overflows += 1,
            Outcome::Failed => self.failed_events += 1,
        }
    }
}

/// State machine owning the tracked index.
#[derive(Debug)]
pub struct EventReconciler {
    pattern: WatchPattern,
    index: TrackedIndex,
    callbacks: Arc<CallbackRegistry>,
    stats: ReconcileStats,
}

impl EventReconciler {
    pub fn new(pattern: WatchPattern, callbacks: Arc<CallbackRegistry>) -> Self {
        Self {
            pattern,
            index: TrackedIndex::new(),
            callbacks,
            stats: ReconcileStats::default(),
        }
    }

    /// Replace the index with the matching names from a directory listing.
    ///
    /// No callbacks run for seeded files. Returns the number tracked.
    pub fn seed(&mut self, names: impl IntoIterator<Item = String>) -> usize {
        let pattern = &self.pattern;
        let matching: Vec<String> = names
            .into_iter()
            .filter_map(|name| basename(&name).map(str::to_string))
            .filter(|name| pattern.matches(name))
            .collect();

        self.index.seed(matching);
        crate::debug_event!("reconciler", "current tracked files", "{:?}", self.index.snapshot());
        self.index.len()
    }

    /// Process one item from an event source.
    ///
    /// Source errors and panics while reconciling are logged and reported
    /// as [`Outcome::Failed`]; they never escape.
    pub fn handle(&mut self, item: SourceItem) -> Outcome {
        let outcome = match item {
            Ok(event) => {
                match panic::catch_unwind(AssertUnwindSafe(|| self.reconcile(event))) {
                    Ok(outcome) => return outcome,
                    Err(payload) => {
                        let err = WatchError::EventError {
                            details: format!("panicked: {}", panic_message(payload.as_ref())),
                        };
                        tracing::error!("[reconciler] hit error but still proceeding: {err}");
                        Outcome::Failed
                    }
                }
            }
            Err(err) => {
                tracing::error!("[reconciler] hit error but still proceeding: {err}");
                Outcome::Failed
            }
        };

        self.stats.record(outcome);
        outcome
    }

    /// Apply one raw event to the index.
    pub fn reconcile(&mut self, event: RawEvent) -> Outcome {
        crate::debug_event!("reconciler", "notified", "{event:?}");

        let outcome = match event {
            RawEvent::Create(raw) => match self.matching_name(&raw) {
                Some(name) => self.file_added(&name),
                None => Outcome::Unmatched,
            },
            RawEvent::Delete(raw) => match self.matching_name(&raw) {
                Some(name) => self.file_deleted(&name),
                None => Outcome::Unmatched,
            },
            RawEvent::Overflow => {
                tracing::warn!(
                    "[reconciler] queue overflow, index may be stale ({} tracked)",
                    self.index.len()
                );
                Outcome::Overflow
            }
        };

        self.stats.record(outcome);
        outcome
    }

    fn matching_name(&self, raw: &str) -> Option<String> {
        let name = basename(raw)?;
        if !self.pattern.matches(name) {
            crate::debug_event!("reconciler", "unmatched", "{name}");
            return None;
        }
        Some(name.to_string())
    }

    fn file_added(&mut self, name: &str) -> Outcome {
        if self.index.contains(name) {
            crate::debug_event!("reconciler", "already tracked", "{name}");
            return Outcome::Duplicate;
        }

        // Callbacks observe the file as not yet tracked
        let dispatch = self.callbacks.fire_add(name);
        self.record_dispatch(dispatch);
        self.index.add(name);

        crate::log_event!("reconciler", "CREATE event processed", "{name}");
        crate::debug_event!("reconciler", "current tracked files", "{:?}", self.index.snapshot());
        Outcome::Added
    }

    fn file_deleted(&mut self, name: &str) -> Outcome {
        if !self.index.contains(name) {
            crate::debug_event!("reconciler", "not tracked", "{name}");
            return Outcome::Untracked;
        }

        let dispatch = self.callbacks.fire_remove(name);
        self.record_dispatch(dispatch);
        self.index.remove(name);

        crate::log_event!("reconciler", "removed from tracked file index", "{name}");
        crate::debug_event!("reconciler", "current tracked files", "{:?}", self.index.snapshot());
        Outcome::Removed
    }

    fn record_dispatch(&mut self, dispatch: Dispatch) {
        self.stats.callback_failures += dispatch.failed as u64;
    }

    /// Read-only view of the tracked files.
    pub fn index(&self) -> &TrackedIndex {
        &self.index
    }

    pub fn pattern(&self) -> &WatchPattern {
        &self.pattern
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    /// Consume the reconciler, keeping the final index.
    pub fn into_index(self) -> TrackedIndex {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Fixture {
        reconciler: EventReconciler,
        callbacks: Arc<CallbackRegistry>,
        log: Arc<Mutex<Vec<String>>>,
    }

    fn fixture(pattern: &str) -> Fixture {
        let callbacks = Arc::new(CallbackRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let add_log = log.clone();
        callbacks.register_on_add(move |name: &str| -> anyhow::Result<()> {
            add_log.lock().push(format!("+{name}"));
            Ok(())
        });
        let remove_log = log.clone();
        callbacks.register_on_remove(move |name: &str| -> anyhow::Result<()> {
            remove_log.lock().push(format!("-{name}"));
            Ok(())
        });

        Fixture {
            reconciler: EventReconciler::new(
                WatchPattern::new(pattern).unwrap(),
                callbacks.clone(),
            ),
            callbacks,
            log,
        }
    }

    fn create(name: &str) -> RawEvent {
        RawEvent::Create(name.to_string())
    }

    fn delete(name: &str) -> RawEvent {
        RawEvent::Delete(name.to_string())
    }

    #[test]
    fn test_duplicate_create_fires_once() {
        let mut f = fixture("dev.*");

        assert_eq!(f.reconciler.reconcile(create("dev1")), Outcome::Added);
        assert_eq!(f.reconciler.reconcile(create("dev1")), Outcome::Duplicate);

        assert_eq!(*f.log.lock(), vec!["+dev1"]);
        assert_eq!(f.reconciler.index().snapshot(), vec!["dev1"]);
    }

    #[test]
    fn test_delete_of_untracked_file_is_ignored() {
        let mut f = fixture("dev.*");

        assert_eq!(f.reconciler.reconcile(delete("dev1")), Outcome::Untracked);

        assert!(f.log.lock().is_empty());
        assert!(f.reconciler.index().is_empty());
    }

    #[test]
    fn test_pattern_filtering() {
        let mut f = fixture("dev.*");

        assert_eq!(f.reconciler.reconcile(create("device1")), Outcome::Added);
        assert_eq!(f.reconciler.reconcile(create("readme.txt")), Outcome::Unmatched);

        assert_eq!(*f.log.lock(), vec!["+device1"]);
        assert!(!f.reconciler.index().contains("readme.txt"));
    }

    #[test]
    fn test_full_paths_are_reduced_to_basename() {
        let mut f = fixture(r"dev\d+");

        f.reconciler.reconcile(create("/run/devices/dev3"));
        f.reconciler.reconcile(delete("/run/devices/dev3"));

        assert_eq!(*f.log.lock(), vec!["+dev3", "-dev3"]);
    }

    #[test]
    fn test_seed_is_silent_and_filtered() {
        let mut f = fixture(r"dev\d+");

        let tracked = f
            .reconciler
            .seed(vec!["devA".to_string(), "dev0".to_string(), "notes".to_string()]);

        assert_eq!(tracked, 1);
        assert_eq!(f.reconciler.index().snapshot(), vec!["dev0"]);
        assert!(f.log.lock().is_empty());

        // A create for a seeded file is a duplicate
        assert_eq!(f.reconciler.reconcile(create("dev0")), Outcome::Duplicate);
        assert!(f.log.lock().is_empty());
    }

    #[test]
    fn test_remove_callbacks_then_untrack() {
        let mut f = fixture("dev");
        f.reconciler.seed(vec!["dev0".to_string()]);

        assert_eq!(f.reconciler.reconcile(delete("dev0")), Outcome::Removed);
        assert_eq!(f.reconciler.reconcile(delete("dev0")), Outcome::Untracked);

        assert_eq!(*f.log.lock(), vec!["-dev0"]);
        assert!(f.reconciler.index().is_empty());
    }

    #[test]
    fn test_failing_callback_still_tracks_file() {
        let mut f = fixture("dev");
        f.callbacks
            .register_on_add(|_: &str| -> anyhow::Result<()> { anyhow::bail!("no such device") });

        assert_eq!(f.reconciler.reconcile(create("dev1")), Outcome::Added);

        assert!(f.reconciler.index().contains("dev1"));
        assert_eq!(f.reconciler.stats().callback_failures, 1);
    }

    #[test]
    fn test_overflow_changes_nothing() {
        let mut f = fixture("dev");
        f.reconciler.seed(vec!["dev0".to_string()]);

        assert_eq!(f.reconciler.reconcile(RawEvent::Overflow), Outcome::Overflow);

        assert_eq!(f.reconciler.index().snapshot(), vec!["dev0"]);
        assert_eq!(f.reconciler.stats().overflows, 1);
    }

    #[test]
    fn test_source_error_is_contained() {
        let mut f = fixture("dev");

        let outcome = f.reconciler.handle(Err(WatchError::EventError {
            details: "inotify read failed".to_string(),
        }));
        assert_eq!(outcome, Outcome::Failed);

        // Next event still goes through
        assert_eq!(f.reconciler.handle(Ok(create("dev1"))), Outcome::Added);
        assert_eq!(f.reconciler.stats().failed_events, 1);
        assert_eq!(f.reconciler.stats().added, 1);
    }

    #[test]
    fn test_stats_track_outcomes() {
        let mut f = fixture("dev");

        f.reconciler.handle(Ok(create("dev1")));
        f.reconciler.handle(Ok(create("dev1")));
        f.reconciler.handle(Ok(create("other")));
        f.reconciler.handle(Ok(delete("dev2")));
        f.reconciler.handle(Ok(delete("dev1")));

        let stats = f.reconciler.stats();
        assert_eq!(stats.added, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.untracked, 1);
        assert_eq!(stats.removed, 1);
    }
}
