//! `Local` — string-keyed storage scoped to the current thread or context.

use crate::storage::{Backend, ForkPropagatedBackend, ThreadIsolatedBackend};
use crate::{LocalError, Mode};
use parking_lot::ReentrantMutex;

enum Storage<V> {
    ThreadIsolated(ThreadIsolatedBackend<V>),
    ForkPropagated(ForkPropagatedBackend<V>),
}

impl<V: Clone + Send + Sync + 'static> Storage<V> {
    fn as_backend(&self) -> &dyn Backend<V> {
        match self {
            Self::ThreadIsolated(backend) => backend,
            Self::ForkPropagated(backend) => backend,
        }
    }
}

/// Named values scoped to the current execution unit.
///
/// In [`Mode::ThreadIsolated`] each OS thread sees only its own values. In
/// [`Mode::ForkPropagated`] values follow the current
/// [`Context`](crate::context::Context): work forked with
/// [`context::spawn`](crate::context::spawn) or
/// [`context::fork_future`](crate::context::fork_future) starts from a
/// snapshot of the forking context and its later writes stay private.
///
/// Every operation runs under one re-entrant lock per instance, covering the
/// whole check-create-write sequence. Values displaced by `set` or `delete`
/// are dropped under that lock, so their destructors may use the same `Local`.
/// Likewise `get` clones the value after releasing every internal guard, so a
/// `Clone` impl may call back into the same `Local`.
///
/// # Example
///
/// ```rust
/// use ctxlocal::{context, Local};
///
/// let local = Local::new(false);
/// local.set("request_id", 7_u64);
///
/// context::fork(|| {
///     assert_eq!(local.get("request_id"), Ok(7));
///     local.set("request_id", 8);
/// });
///
/// assert_eq!(local.get("request_id"), Ok(7));
/// assert!(local.delete("missing").is_err());
/// ```
pub struct Local<V> {
    mode: Mode,
    storage: ReentrantMutex<Storage<V>>,
}

impl<V: Clone + Send + Sync + 'static> Local<V> {
    /// Creates a `Local`; `thread_critical` selects [`Mode::ThreadIsolated`].
    pub fn new(thread_critical: bool) -> Self {
        Self::with_mode(Mode::from(thread_critical))
    }

    /// Creates a `Local` backed by `mode`.
    pub fn with_mode(mode: Mode) -> Self {
        let storage = match mode {
            Mode::ThreadIsolated => Storage::ThreadIsolated(ThreadIsolatedBackend::new()),
            Mode::ForkPropagated => Storage::ForkPropagated(ForkPropagatedBackend::new()),
        };
        Self {
            mode,
            storage: ReentrantMutex::new(storage),
        }
    }

    /// Returns the value of `key` in the current execution unit.
    ///
    /// # Errors
    ///
    /// [`LocalError::NotFound`] if `key` was never set here or was deleted.
    pub fn get(&self, key: &str) -> Result<V, LocalError> {
        self.storage.lock().as_backend().get(key)
    }

    /// Sets `key` to `value` in the current execution unit.
    pub fn set(&self, key: impl AsRef<str>, value: V) {
        self.storage.lock().as_backend().set(key.as_ref(), value);
    }

    /// Deletes `key` from the current execution unit.
    ///
    /// In fork-propagated mode the key's slot is kept and shadowed, so contexts
    /// forked earlier keep their values.
    ///
    /// # Errors
    ///
    /// [`LocalError::NotFound`] if `key` has no value here, including when it
    /// was never set or is already deleted.
    pub fn delete(&self, key: &str) -> Result<(), LocalError> {
        self.storage.lock().as_backend().delete(key)
    }

    /// Returns `true` if [`get`](Self::get) would succeed for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.storage.lock().as_backend().contains(key)
    }
}

impl<V> Local<V> {
    /// The mode fixed at construction.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns `true` if this instance is thread-isolated.
    #[inline]
    pub fn is_thread_critical(&self) -> bool {
        self.mode.is_thread_critical()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for Local<V> {
    fn default() -> Self {
        Self::with_mode(Mode::default())
    }
}

impl<V> core::fmt::Debug for Local<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Local").field("mode", &self.mode).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context;

    #[test]
    fn test_set_get_delete_both_modes() {
        for mode in [Mode::ThreadIsolated, Mode::ForkPropagated] {
            let local = Local::with_mode(mode);
            local.set("k", 1);
            assert_eq!(local.get("k"), Ok(1), "{mode}");
            local.delete("k").unwrap();
            assert!(local.get("k").unwrap_err().is_not_found(), "{mode}");
            local.set("k", 2);
            assert_eq!(local.get("k"), Ok(2), "{mode}");
        }
    }

    #[test]
    fn test_mode_is_fixed() {
        let local: Local<()> = Local::new(true);
        assert!(local.is_thread_critical());
        assert_eq!(local.mode(), Mode::ThreadIsolated);
        assert_eq!(Local::<()>::default().mode(), Mode::ForkPropagated);
    }

    #[test]
    fn test_thread_critical_ignores_context_fork() {
        let local = Local::new(true);
        local.set("handle", 3);

        // Same thread, different context: still visible.
        context::fork(|| assert_eq!(local.get("handle"), Ok(3)));

        let seen = context::spawn({
            let local = std::sync::Arc::new(local);
            move || local.get("handle")
        });
        assert!(seen.join().unwrap().is_err());
    }

    #[test]
    fn test_delete_policy_is_stable() {
        for mode in [Mode::ThreadIsolated, Mode::ForkPropagated] {
            let local = Local::<i32>::with_mode(mode);
            for _ in 0..4 {
                assert_eq!(local.delete("ghost"), Err(LocalError::not_found("ghost")));
            }
        }
    }
}
