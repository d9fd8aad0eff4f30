//! `ContextVar` — a fork-propagated variable.

use core::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Ids are never reused, so a stale handle can never alias a newer variable.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A variable whose value is scoped to the current [`Context`](super::Context).
///
/// The handle itself is just an id; clones refer to the same variable.
pub struct ContextVar<T> {
    id: u64,
    name: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ContextVar<T> {
    /// Creates a new variable with no value in any context.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// Calls `f` with the value resolved in the current context, if any.
    ///
    /// No internal borrow is held while `f` runs.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let value = super::lookup(self.id);
        f(value.as_deref().and_then(|value| value.downcast_ref::<T>()))
    }

    /// Returns a clone of the value resolved in the current context.
    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.with(|value| value.cloned())
    }

    /// Returns `true` if the current context holds a value for this variable.
    pub fn is_set(&self) -> bool {
        self.with(|value| value.is_some())
    }

    /// Sets the value for the current context.
    ///
    /// The displaced value is returned rather than dropped; other forked
    /// contexts may still share it.
    pub fn set(&self, value: T) -> Option<Arc<T>> {
        super::store(self.id, Arc::new(value)).and_then(|old| old.downcast::<T>().ok())
    }
}

impl<T> ContextVar<T> {
    /// The name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for ContextVar<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            _marker: PhantomData,
        }
    }
}

impl<T> core::fmt::Debug for ContextVar<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextVar")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
