//! Error types for the directory monitor.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from monitor operations.
///
/// Only the configuration-time variants ever reach the caller of
/// [`FileMonitor::run`](super::FileMonitor::run). Everything else is logged
/// at the point it happens and the loop keeps going.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Invalid watch pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Cannot read watch directory {path}: {reason}")]
    DirUnreadable { path: PathBuf, reason: String },

    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Callback '{callback}' failed for {filename}: {reason}")]
    CallbackFailed {
        callback: String,
        filename: String,
        reason: String,
    },

    #[error("File system event error: {details}")]
    EventError { details: String },
}

impl WatchError {
    /// Whether this error prevents the monitor from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatchError::InvalidPattern { .. }
                | WatchError::DirUnreadable { .. }
                | WatchError::InitFailed { .. }
                | WatchError::PathWatchFailed { .. }
        )
    }
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
