//! Callback trait and registry for add/remove notifications.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use super::WatchError;

/// A consumer notified when a tracked file appears or disappears.
///
/// Implemented for any `Fn(&str) -> anyhow::Result<()>` closure, so most
/// callers never implement it by hand.
pub trait FileCallback: Send + Sync {
    /// Callback name for logging.
    fn name(&self) -> &str {
        "callback"
    }

    /// Handle a file event. `filename` is the basename, never a full path.
    fn on_file_event(&self, filename: &str) -> anyhow::Result<()>;
}

impl<F> FileCallback for F
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    fn on_file_event(&self, filename: &str) -> anyhow::Result<()> {
        self(filename)
    }
}

/// A closure with a name attached, see [`named`].
pub struct Named<F> {
    name: String,
    func: F,
}

impl<F> FileCallback for Named<F>
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_file_event(&self, filename: &str) -> anyhow::Result<()> {
        (self.func)(filename)
    }
}

/// Give a closure a name that shows up in failure logs.
pub fn named<F>(name: impl Into<String>, func: F) -> Named<F>
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    Named {
        name: name.into(),
        func,
    }
}

/// Result of dispatching one event to a callback list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// Callbacks that were called.
    pub invoked: usize,
    /// Callbacks that returned an error or panicked.
    pub failed: usize,
}

type CallbackList = RwLock<Vec<Arc<dyn FileCallback>>>;

/// Ordered add/remove callback lists.
///
/// Registration is append-only and may happen while the monitor is running:
/// dispatch iterates over a copy of the list, so a callback registered
/// mid-dispatch first runs on the next event.
#[derive(Default)]
pub struct CallbackRegistry {
    on_add: CallbackList,
    on_remove: CallbackList,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback run when a matching file is created.
    pub fn register_on_add(&self, callback: impl FileCallback + 'static) {
        self.on_add.write().push(Arc::new(callback));
    }

    /// Append a callback run when a tracked file is deleted.
    pub fn register_on_remove(&self, callback: impl FileCallback + 'static) {
        self.on_remove.write().push(Arc::new(callback));
    }

    /// Run every add callback in registration order.
    pub fn fire_add(&self, filename: &str) -> Dispatch {
        Self::fire("add", &self.on_add, filename)
    }

    /// Run every remove callback in registration order.
    pub fn fire_remove(&self, filename: &str) -> Dispatch {
        Self::fire("remove", &self.on_remove, filename)
    }

    pub fn add_count(&self) -> usize {
        self.on_add.read().len()
    }

    pub fn remove_count(&self) -> usize {
        self.on_remove.read().len()
    }

    fn fire(kind: &str, list: &CallbackList, filename: &str) -> Dispatch {
        // Release the lock before calling out so callbacks can register more callbacks
        let callbacks: Vec<Arc<dyn FileCallback>> = list.read().clone();
        let mut dispatch = Dispatch::default();

        for callback in callbacks {
            crate::debug_event!("callbacks", kind, "{} <- {filename}", callback.name());
            dispatch.invoked += 1;

            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| callback.on_file_event(filename)));
            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };

            dispatch.failed += 1;
            let err = WatchError::CallbackFailed {
                callback: callback.name().to_string(),
                filename: filename.to_string(),
                reason,
            };
            tracing::error!("[callbacks] {kind} {err}");
        }

        dispatch
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("on_add", &self.add_count())
            .field("on_remove", &self.remove_count())
            .finish()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
