//! # `ctxlocal` - Thread- and Context-Scoped Local Storage
//!
//! Gives each logical unit of execution its own isolated set of named values.
//! A unit is either an OS thread or a cooperatively scheduled task sharing a
//! thread. Forked work inherits a snapshot of its parent's values.
//! Sync/async bridging layers use it to carry per-call state (event-loop
//! markers, deadlines, held handles) without leaking it between unrelated
//! concurrent units.
//!
//! ## Architecture
//!
//! 1. **Execution contexts** ([`context`]):
//!    - `Context` is an immutable snapshot of [`ContextVar`](context::ContextVar)
//!      values, backed by a persistent map
//!    - Cloning a context *is* forking it: O(1), structurally shared
//!    - Threads ([`context::spawn`]) and futures ([`context::fork_future`]) carry
//!      a fork of the context they were created in
//!
//! 2. **Backends** ([`storage`]):
//!    - [`ThreadIsolatedBackend`](storage::ThreadIsolatedBackend): one slice per
//!      OS thread, released when the thread exits
//!    - [`ForkPropagatedBackend`](storage::ForkPropagatedBackend): one
//!      propagation slot per key; deletion writes the process-wide
//!      [`Tombstone`](storage::Tombstone) instead of removing the slot
//!
//! 3. **Facade** ([`Local`]):
//!    - `get` / `set` / `delete` keyed by string
//!    - One re-entrant lock per instance around every operation
//!    - Backend chosen once via [`Mode`]
//!
//! ## Guarantees
//!
//! - A `set` is visible to every later `get` in the same context lineage, and
//!   to contexts forked after it returns.
//! - Writes in a fork never reach the parent or siblings.
//! - In thread-isolated mode, a value set on one thread is never observed on
//!   another; the lookup fails with [`LocalError::NotFound`] instead.
//! - Deleting a key with no value fails with [`LocalError::NotFound`], in both
//!   modes and on every repetition.
//!
//! ## Known limitation
//!
//! Fork-propagated slots are never reclaimed while their `Local` is alive.
//! Contexts forked earlier may still resolve through a slot, so deleted keys
//! keep theirs and the slot table grows with the number of distinct keys.
//!
//! ## Example
//!
//! ```rust
//! use ctxlocal::{context, Local};
//! use std::sync::Arc;
//!
//! let local = Arc::new(Local::new(false));
//! local.set("on_event_loop", true);
//!
//! let worker = context::spawn({
//!     let local = Arc::clone(&local);
//!     move || {
//!         let inherited = local.get("on_event_loop");
//!         local.set("on_event_loop", false);
//!         inherited
//!     }
//! });
//!
//! assert_eq!(worker.join().unwrap(), Ok(true));
//! assert_eq!(local.get("on_event_loop"), Ok(true));
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

/// Emits a `tracing` event when the `tracing` feature is enabled.
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    }};
}
pub(crate) use trace;

pub mod context;
pub mod error;
pub mod local;
pub mod mode;
pub mod storage;

pub use error::LocalError;
pub use local::Local;
pub use mode::{Mode, ParseModeError};

// `Local` must stay shareable across threads for any storable value.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Local<u64>>();
    assert_send_sync::<context::Context>();
    assert_send_sync::<context::ContextVar<std::rc::Rc<u8>>>();
};
