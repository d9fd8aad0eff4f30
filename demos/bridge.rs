//! Sketch of a sync/async bridging layer built on two `Local`s.
//!
//! A thread-critical `Local` marks the thread driving the event loop; a
//! fork-propagated `Local` carries a per-call deadline into forked work.

use anyhow::{ensure, Context as _, Result};
use ctxlocal::context;
use ctxlocal::Local;
use futures::executor::block_on;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Bridge {
    loop_thread: Arc<Local<bool>>,
    call_scope: Arc<Local<Instant>>,
}

impl Bridge {
    fn new() -> Self {
        Self {
            loop_thread: Arc::new(Local::new(true)),
            call_scope: Arc::new(Local::new(false)),
        }
    }

    fn on_event_loop(&self) -> bool {
        self.loop_thread.get("running").unwrap_or(false)
    }

    fn deadline(&self) -> Option<Instant> {
        self.call_scope.get("deadline").ok()
    }

    /// Runs `work` on a worker thread that inherits the caller's call scope.
    fn sync_to_worker<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Bridge) -> T + Send + 'static,
        T: Send + 'static,
    {
        let bridge = self.clone();
        context::spawn(move || work(&bridge))
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))
    }
}

fn main() -> Result<()> {
    let bridge = Bridge::new();

    block_on(async {
        bridge.loop_thread.set("running", true);
        ensure!(bridge.on_event_loop(), "event-loop marker missing on the loop thread");

        bridge.call_scope.set("deadline", Instant::now() + Duration::from_secs(5));

        let (worker_on_loop, worker_deadline) =
            bridge.sync_to_worker(|b| (b.on_event_loop(), b.deadline()))?;

        ensure!(!worker_on_loop, "worker thread must not look like the event loop");
        let deadline = worker_deadline.context("deadline did not propagate to the worker")?;
        println!(
            "worker inherited deadline with {:?} left",
            deadline.saturating_duration_since(Instant::now())
        );

        bridge.call_scope.delete("deadline")?;
        ensure!(bridge.deadline().is_none(), "deadline still visible after delete");
        Ok(())
    })
}
