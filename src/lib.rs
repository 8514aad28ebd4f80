//! Watch a directory for files matching a pattern and react when they
//! appear or disappear.
//!
//! ```no_run
//! use dirwatch::FileMonitor;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), dirwatch::WatchError> {
//! let monitor = FileMonitor::builder()
//!     .watch_dir("/run/devices")
//!     .pattern(r"dev\d+")
//!     .on_add(|name: &str| -> anyhow::Result<()> {
//!         println!("attached {name}");
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let report = monitor.run(CancellationToken::new()).await?;
//! println!("still tracked: {:?}", report.tracked);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod logging;
pub mod monitor;

pub use config::Settings;
pub use monitor::{
    CallbackRegistry, EventReconciler, FileCallback, FileMonitor, MonitorReport, RawEvent,
    TrackedIndex, WatchError, WatchPattern,
};
