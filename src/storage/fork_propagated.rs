//! `ForkPropagatedBackend` — one propagation slot per key.

use super::{Backend, Entry};
use crate::context::ContextVar;
use crate::LocalError;
use std::cell::RefCell;
use std::collections::HashMap;

/// Stores each key in its own [`ContextVar`], so values follow the
/// [`Context`](crate::context::Context) lineage: forks inherit a snapshot and
/// are isolated from the parent afterwards.
///
/// Slots are created on first `set` and never removed. A deleted key keeps its
/// slot and holds the [`Tombstone`](super::Tombstone) in the deleting context,
/// because contexts forked earlier may still resolve through it. The slot table
/// therefore grows with the number of distinct keys ever written.
pub struct ForkPropagatedBackend<V> {
    slots: RefCell<HashMap<String, ContextVar<Entry<V>>>>,
}

impl<V: Clone + Send + Sync + 'static> ForkPropagatedBackend<V> {
    /// Creates a backend with no slots.
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(HashMap::new()),
        }
    }

    /// Number of slots ever created (deleted keys included).
    pub fn slot_count(&self) -> usize {
        self.slots.borrow().len()
    }

    fn slot(&self, key: &str) -> Option<ContextVar<Entry<V>>> {
        self.slots.borrow().get(key).cloned()
    }

    fn slot_or_create(&self, key: &str) -> ContextVar<Entry<V>> {
        if let Some(slot) = self.slot(key) {
            return slot;
        }
        let slot = ContextVar::new(key);
        self.slots.borrow_mut().insert(key.to_owned(), slot.clone());
        crate::trace!(key, "created propagation slot");
        slot
    }

    fn resolve(slot: &ContextVar<Entry<V>>) -> Option<V> {
        slot.with(|entry| entry.and_then(Entry::live).cloned())
    }
}

impl<V: Clone + Send + Sync + 'static> Default for ForkPropagatedBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> Backend<V> for ForkPropagatedBackend<V> {
    fn get(&self, key: &str) -> Result<V, LocalError> {
        self.slot(key)
            .and_then(|slot| Self::resolve(&slot))
            .ok_or_else(|| LocalError::not_found(key))
    }

    fn set(&self, key: &str, value: V) {
        let displaced = self.slot_or_create(key).set(Entry::Live(value));
        drop(displaced);
    }

    fn delete(&self, key: &str) -> Result<(), LocalError> {
        let slot = self
            .slot(key)
            .filter(|slot| slot.with(|entry| entry.and_then(Entry::live).is_some()))
            .ok_or_else(|| LocalError::not_found(key))?;
        let displaced = slot.set(Entry::deleted());
        crate::trace!(key, "wrote tombstone");
        drop(displaced);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.slot(key)
            .is_some_and(|slot| slot.with(|entry| entry.and_then(Entry::live).is_some()))
    }
}

impl<V> core::fmt::Debug for ForkPropagatedBackend<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForkPropagatedBackend")
            .field("slots", &self.slots.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{self, Context};

    #[test]
    fn test_tombstone_shadows_then_reuse() {
        let backend = ForkPropagatedBackend::new();
        backend.set("k", 1);
        backend.delete("k").unwrap();
        assert!(backend.get("k").unwrap_err().is_not_found());
        assert!(!backend.contains("k"));

        backend.set("k", 2);
        assert_eq!(backend.get("k"), Ok(2));
        assert_eq!(backend.slot_count(), 1);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let backend = ForkPropagatedBackend::<u8>::new();
        for _ in 0..3 {
            assert!(backend.delete("never").unwrap_err().is_not_found());
        }
        assert_eq!(backend.slot_count(), 0);
    }

    #[test]
    fn test_delete_in_fork_leaves_parent() {
        let backend = ForkPropagatedBackend::new();
        backend.set("k", "parent");

        context::fork(|| {
            backend.delete("k").unwrap();
            assert!(backend.get("k").is_err());
            assert!(backend.delete("k").is_err());
        });

        assert_eq!(backend.get("k"), Ok("parent"));
    }

    #[test]
    fn test_slot_created_in_fork_is_absent_in_parent() {
        let backend = ForkPropagatedBackend::new();
        let mut child = Context::current();

        child.run(|| backend.set("late", 5));

        assert_eq!(backend.slot_count(), 1);
        assert!(backend.get("late").unwrap_err().is_not_found());
        assert!(backend.delete("late").is_err());
        assert_eq!(child.run(|| backend.get("late")), Ok(5));
    }
}
