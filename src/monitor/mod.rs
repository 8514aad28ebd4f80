//! Directory monitor that tracks files matching a pattern.
//!
//! Watches a single directory for create/delete events, keeps an index of
//! the matching files that are present, and runs registered callbacks when
//! a file enters or leaves the index.
//!
//! # Architecture
//!
//! ```text
//! FileMonitor
//!   - list_directory (seed, no callbacks)
//!   - EventSource (NotifySource or ChannelSource)
//!         |
//!      RawEvent
//!         |
//!   EventReconciler
//!     - WatchPattern   (basename filter)
//!     - TrackedIndex   (present / absent)
//!     - CallbackRegistry (on_add, on_remove)
//! ```

mod callback;
mod error;
mod file_monitor;
mod index;
mod pattern;
mod reconciler;
mod source;

pub use callback::{CallbackRegistry, Dispatch, FileCallback, Named, named};
pub use error::WatchError;
pub use file_monitor::{FileMonitor, FileMonitorBuilder, MonitorReport, StartedMonitor};
pub use index::TrackedIndex;
pub use pattern::{WatchPattern, basename};
pub use reconciler::{EventReconciler, Outcome, ReconcileStats};
pub use source::{ChannelSource, EventSource, NotifySource, RawEvent, SourceItem, list_directory};
