//! Copy-on-fork execution contexts.
//!
//! Every OS thread has a *current* [`Context`]: an immutable snapshot mapping
//! [`ContextVar`] ids to values. Snapshots are backed by a persistent hash map,
//! so [`Context::current`] is an O(1) fork and writes made after the fork never
//! leak into the parent (or into siblings forked at other instants).
//!
//! Cooperative tasks get the same isolation through [`Context::scope`], which
//! enters the task's context around every poll.
//!
//! ```rust
//! use ctxlocal::context::{self, ContextVar};
//!
//! let deadline = ContextVar::new("deadline");
//! deadline.set(10_u64);
//!
//! let child = context::fork(|| {
//!     assert_eq!(deadline.get(), Some(10));
//!     deadline.set(5);
//!     deadline.get()
//! });
//!
//! assert_eq!(child, Some(5));
//! assert_eq!(deadline.get(), Some(10));
//! ```

mod future;
mod var;

pub use future::Scoped;
pub use var::ContextVar;

use std::any::Any;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;
use std::thread;

/// Type-erased value stored in a context.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

thread_local! {
    static CURRENT: RefCell<Context> = RefCell::new(Context::new());
}

/// A snapshot of every [`ContextVar`] value visible to one execution lineage.
///
/// Cloning is cheap (structural sharing) and is exactly the fork operation.
#[derive(Clone, Default)]
pub struct Context {
    values: im::HashMap<u64, Erased>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forks the current thread's context.
    pub fn current() -> Self {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Number of variables holding a value in this context.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no variable holds a value in this context.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Runs `f` with `self` as the current context.
    ///
    /// Writes performed by `f` are kept in `self`. The previously current
    /// context is restored on return, including on unwind.
    pub fn run<R>(&mut self, f: impl FnOnce() -> R) -> R {
        let _entered = Entered::enter(self);
        f()
    }

    /// Wraps `future` so that every poll runs inside this context.
    pub fn scope<F: Future>(self, future: F) -> Scoped<F> {
        Scoped::new(self, future)
    }
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context").field("len", &self.values.len()).finish()
    }
}

/// Runs `f` in a fork of the current context; its writes are discarded.
pub fn fork<R>(f: impl FnOnce() -> R) -> R {
    Context::current().run(f)
}

/// Wraps `future` in a fork of the current context, taken now.
pub fn fork_future<F: Future>(future: F) -> Scoped<F> {
    Context::current().scope(future)
}

/// Spawns an OS thread that runs `f` in a fork of the spawning thread's context.
pub fn spawn<F, T>(f: F) -> thread::JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let mut context = Context::current();
    thread::spawn(move || context.run(f))
}

/// Scoped-thread counterpart of [`spawn`].
pub fn spawn_scoped<'scope, 'env, F, T>(
    scope: &'scope thread::Scope<'scope, 'env>,
    f: F,
) -> thread::ScopedJoinHandle<'scope, T>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    let mut context = Context::current();
    scope.spawn(move || context.run(f))
}

pub(crate) fn lookup(id: u64) -> Option<Erased> {
    CURRENT.with(|current| current.borrow().values.get(&id).cloned())
}

/// Writes into the current context, handing back the displaced value so the
/// caller drops it outside the borrow.
pub(crate) fn store(id: u64, value: Erased) -> Option<Erased> {
    CURRENT.with(|current| current.borrow_mut().values.insert(id, value))
}

fn swap_current(context: Context) -> Context {
    CURRENT.with(|current| core::mem::replace(&mut *current.borrow_mut(), context))
}

/// While alive, `slot` holds the context that was current before entering.
struct Entered<'a> {
    slot: &'a mut Context,
}

impl<'a> Entered<'a> {
    fn enter(context: &'a mut Context) -> Self {
        let entering = core::mem::take(context);
        *context = swap_current(entering);
        crate::trace!("entered execution context");
        Self { slot: context }
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        let previous = core::mem::take(self.slot);
        *self.slot = swap_current(previous);
        crate::trace!(len = self.slot.len(), "left execution context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_keeps_writes_in_context() {
        let var = ContextVar::new("x");
        let mut ctx = Context::new();

        ctx.run(|| var.set(1_i32));
        assert_eq!(var.get(), None);
        assert_eq!(ctx.len(), 1);

        let seen = ctx.run(|| var.get());
        assert_eq!(seen, Some(1));
    }

    #[test]
    fn test_fork_discards_child_writes() {
        let var = ContextVar::new("x");
        var.set(1_i32);

        fork(|| {
            assert_eq!(var.get(), Some(1));
            var.set(2);
            assert_eq!(var.get(), Some(2));
        });

        assert_eq!(var.get(), Some(1));
    }

    #[test]
    fn test_parent_writes_after_fork_are_invisible() {
        let var = ContextVar::new("x");
        var.set(1_i32);
        let mut child = Context::current();

        var.set(3);

        assert_eq!(child.run(|| var.get()), Some(1));
        assert_eq!(var.get(), Some(3));
    }

    #[test]
    fn test_run_restores_on_panic() {
        let var = ContextVar::new("x");
        var.set("outer");

        let mut ctx = Context::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ctx.run(|| {
                var.set("inner");
                panic!("boom");
            })
        }));

        assert!(result.is_err());
        assert_eq!(var.get(), Some("outer"));
        assert_eq!(ctx.run(|| var.get()), Some("inner"));
    }

    #[test]
    fn test_spawn_inherits_snapshot() {
        let var = ContextVar::new("x");
        var.set(7_u32);

        let handle = spawn({
            let var = var.clone();
            move || {
                let inherited = var.get();
                var.set(8);
                inherited
            }
        });

        assert_eq!(handle.join().unwrap(), Some(7));
        assert_eq!(var.get(), Some(7));
    }

    #[test]
    fn test_plain_thread_starts_empty() {
        let var = ContextVar::new("x");
        var.set(7_u32);

        let seen = thread::scope(|s| s.spawn(|| var.get()).join().unwrap());
        assert_eq!(seen, None);
    }
}
