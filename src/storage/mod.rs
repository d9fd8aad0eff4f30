//! Storage backends behind [`Local`](crate::Local).
//!
//! Both backends resolve keys against the *current* execution unit:
//!
//! - [`ThreadIsolatedBackend`]: the current OS thread. Nothing crosses a
//!   thread boundary.
//! - [`ForkPropagatedBackend`]: the current [`Context`](crate::context::Context)
//!   lineage. Forked threads and tasks inherit a snapshot.
//!
//! Backends are not internally serialized against compound check-then-act
//! sequences; [`Local`](crate::Local) wraps them in its instance lock.

mod fork_propagated;
mod thread_isolated;
mod tombstone;

pub use fork_propagated::ForkPropagatedBackend;
pub use thread_isolated::ThreadIsolatedBackend;
pub use tombstone::Tombstone;

pub(crate) use tombstone::Entry;

use crate::LocalError;

/// String-keyed storage resolved against the current execution unit.
///
/// Implementations drop displaced values only after releasing their own
/// internal borrows, so a value's destructor may call back into the backend.
pub trait Backend<V> {
    /// Resolves `key` in the current execution unit.
    fn get(&self, key: &str) -> Result<V, LocalError>;

    /// Writes `value` for `key` in the current execution unit.
    fn set(&self, key: &str, value: V);

    /// Removes `key` from the current execution unit.
    ///
    /// Fails with [`LocalError::NotFound`] when `key` has no live value there.
    fn delete(&self, key: &str) -> Result<(), LocalError>;

    /// Returns `true` if `key` resolves to a live value.
    fn contains(&self, key: &str) -> bool;
}
