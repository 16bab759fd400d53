//! Observable wrapper over a host-owned ordered collection.
//!
//! [`ObservedList`] wraps an existing [`SharedList`] so that every element
//! appended through it triggers a callback, while every other operation
//! delegates transparently. The wrapper holds its own gate: append + notify
//! run as one unit, so concurrent appends from multiple acceptor threads
//! never interleave notifications or reorder a notification against its
//! insertion.

use std::error::Error;
use std::sync::{Mutex, PoisonError};

use log::warn;
use splice_host::list::{ListHandle, SharedList};

/// Boxed error type carried by append callbacks and installers.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Callback invoked for every element appended through an [`ObservedList`].
pub type AppendFn<T> = Box<dyn Fn(&T) -> Result<(), BoxError> + Send + Sync>;

/// A [`SharedList`] decorator that notifies a callback on every append.
///
/// The callback runs synchronously, under a lock scoped to this wrapper,
/// after the underlying append and before `append` returns. If the callback
/// fails, the failure is logged and the append stands: the entry was accepted
/// by the host, only its translation setup is skipped.
pub struct ObservedList<T> {
    inner: ListHandle<T>,
    on_append: AppendFn<T>,
    gate: Mutex<()>,
}

impl<T> ObservedList<T> {
    /// Wraps `inner` so every append through the wrapper invokes `on_append`.
    pub fn new(inner: ListHandle<T>, on_append: AppendFn<T>) -> Self {
        Self {
            inner,
            on_append,
            gate: Mutex::new(()),
        }
    }

    /// The exact collection instance this wrapper was constructed from.
    pub fn original(&self) -> ListHandle<T> {
        self.inner.clone()
    }

    /// Runs `f` under the same gate the append path takes.
    ///
    /// Used to process entries that predate the wrapper without racing
    /// against appends arriving concurrently through it.
    pub fn with_gate<R>(&self, f: impl FnOnce() -> R) -> R {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

impl<T> SharedList<T> for ObservedList<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn append(&self, item: T) {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.append(item.clone());
        if let Err(err) = (self.on_append)(&item) {
            warn!("append observer failed, entry left untranslated: {}", err);
        }
    }

    fn remove(&self, item: &T) -> bool {
        self.inner.remove(item)
    }

    fn contains(&self, item: &T) -> bool {
        self.inner.contains(item)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn snapshot(&self) -> Vec<T> {
        self.inner.snapshot()
    }
}
