//! `Scoped` — a future that polls inside its own context.

use super::Context;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context as TaskContext, Poll};

/// A future bound to an execution [`Context`].
///
/// Returned by [`Context::scope`] and [`fork_future`](super::fork_future).
/// Each poll enters the bound context, so tasks interleaved on one thread keep
/// independent views of every [`ContextVar`](super::ContextVar).
pub struct Scoped<F> {
    context: Context,
    future: F,
}

impl<F> Scoped<F> {
    pub(super) fn new(context: Context, future: F) -> Self {
        Self { context, future }
    }

    /// The context this future polls in, including writes made so far.
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl<F: Future> Future for Scoped<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        // SAFETY: `future` is structurally pinned and never moved out of `self`;
        // `context` is not pinned and may be swapped freely.
        let this = unsafe { self.get_unchecked_mut() };
        let future = unsafe { Pin::new_unchecked(&mut this.future) };
        this.context.run(|| future.poll(cx))
    }
}
