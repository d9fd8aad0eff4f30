//! `ThreadIsolatedBackend` — one slice of values per OS thread.

use super::Backend;
use crate::LocalError;
use crossbeam_utils::sync::{ShardedLock, ShardedLockReadGuard, ShardedLockWriteGuard};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, Weak};
use std::thread::{self, ThreadId};

/// Values are boxed in `Arc` so lookups can clone them after the guard drops.
type Slices<V> = ShardedLock<HashMap<ThreadId, HashMap<String, Arc<V>>>>;

/// Something holding per-thread state that must go when the thread exits.
trait ThreadSliceOwner: Send + Sync {
    fn release(&self, thread: ThreadId);
}

impl<V: Send + Sync> ThreadSliceOwner for Slices<V> {
    fn release(&self, thread: ThreadId) {
        let slice = self.write().unwrap_or_else(PoisonError::into_inner).remove(&thread);
        if slice.is_some() {
            crate::trace!(?thread, "released thread slice");
        }
        drop(slice);
    }
}

/// Runs at thread exit and releases the thread's slice from every backend it
/// wrote into that is still alive.
struct ExitHook {
    thread: ThreadId,
    owners: Vec<Weak<dyn ThreadSliceOwner>>,
}

impl Drop for ExitHook {
    fn drop(&mut self) {
        for owner in self.owners.drain(..) {
            if let Some(owner) = owner.upgrade() {
                owner.release(self.thread);
            }
        }
    }
}

thread_local! {
    static EXIT_HOOK: RefCell<ExitHook> = RefCell::new(ExitHook {
        thread: thread::current().id(),
        owners: Vec::new(),
    });
}

/// Values visible only on the OS thread that wrote them.
///
/// A value set on one thread is never observable from another, even through a
/// shared [`Local`](crate::Local); lookups from the wrong thread fail with
/// [`LocalError::NotFound`]. A thread's slice is dropped when the thread exits,
/// and every remaining slice is dropped with the backend.
///
/// Threads are identified by [`ThreadId`], which is never reused.
pub struct ThreadIsolatedBackend<V> {
    slices: Arc<Slices<V>>,
}

impl<V: Clone + Send + Sync + 'static> ThreadIsolatedBackend<V> {
    /// Creates a backend with no slices.
    pub fn new() -> Self {
        Self {
            slices: Arc::new(ShardedLock::new(HashMap::new())),
        }
    }

    /// Number of threads currently holding a slice.
    pub fn thread_count(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> ShardedLockReadGuard<'_, HashMap<ThreadId, HashMap<String, Arc<V>>>> {
        self.slices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> ShardedLockWriteGuard<'_, HashMap<ThreadId, HashMap<String, Arc<V>>>> {
        self.slices.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn register_exit(&self) {
        let owner: Weak<Slices<V>> = Arc::downgrade(&self.slices);
        let owner: Weak<dyn ThreadSliceOwner> = owner;
        // Fails only while this thread's locals are being torn down; the slice
        // then lives until the backend is dropped.
        let _ = EXIT_HOOK.try_with(|hook| {
            let mut hook = hook.borrow_mut();
            hook.owners.retain(|owner| owner.strong_count() > 0);
            hook.owners.push(owner);
        });
    }
}

impl<V: Clone + Send + Sync + 'static> Default for ThreadIsolatedBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> Backend<V> for ThreadIsolatedBackend<V> {
    fn get(&self, key: &str) -> Result<V, LocalError> {
        let thread = thread::current().id();
        let value = self
            .read()
            .get(&thread)
            .and_then(|slice| slice.get(key))
            .cloned()
            .ok_or_else(|| LocalError::not_found(key))?;
        // `V::clone` runs outside the guard and may use this backend.
        Ok(V::clone(&value))
    }

    fn set(&self, key: &str, value: V) {
        let thread = thread::current().id();
        let (displaced, created) = {
            let mut slices = self.write();
            let created = !slices.contains_key(&thread);
            let displaced = slices.entry(thread).or_default().insert(key.to_owned(), Arc::new(value));
            (displaced, created)
        };
        if created {
            crate::trace!(?thread, "created thread slice");
            self.register_exit();
        }
        drop(displaced);
    }

    fn delete(&self, key: &str) -> Result<(), LocalError> {
        let thread = thread::current().id();
        let removed = self
            .write()
            .get_mut(&thread)
            .and_then(|slice| slice.remove(key));
        match removed {
            Some(value) => {
                drop(value);
                Ok(())
            }
            None => Err(LocalError::not_found(key)),
        }
    }

    fn contains(&self, key: &str) -> bool {
        let thread = thread::current().id();
        self.read()
            .get(&thread)
            .is_some_and(|slice| slice.contains_key(key))
    }
}

impl<V> core::fmt::Debug for ThreadIsolatedBackend<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadIsolatedBackend").finish_non_exhaustive()
    }
}
