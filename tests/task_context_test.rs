use ctxlocal::context::{self, Context};
use ctxlocal::Local;
use futures::executor::block_on;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

/// Returns `Pending` once, waking itself, so `join!` switches tasks.
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

fn yield_now() -> YieldNow {
    YieldNow(false)
}

#[test]
fn test_interleaved_tasks_keep_own_values() {
    let local = Local::new(false);
    local.set("task", "parent");

    let a = context::fork_future(async {
        local.set("task", "a");
        yield_now().await;
        local.get("task")
    });
    let b = context::fork_future(async {
        assert_eq!(local.get("task"), Ok("parent"));
        local.set("task", "b");
        yield_now().await;
        local.get("task")
    });

    let (a, b) = block_on(async { futures::join!(a, b) });
    assert_eq!(a, Ok("a"));
    assert_eq!(b, Ok("b"));
    assert_eq!(local.get("task"), Ok("parent"));
}

#[test]
fn test_delete_inside_task_is_private() {
    let local = Local::new(false);
    local.set("deadline", 5_u64);

    let task = context::fork_future(async {
        local.delete("deadline").unwrap();
        yield_now().await;
        local.contains("deadline")
    });

    assert!(!block_on(task));
    assert_eq!(local.get("deadline"), Ok(5));
}

#[test]
fn test_nested_fork_inherits_from_task() {
    let local = Local::new(false);

    let outer = Context::new().scope(async {
        local.set("depth", 1_u32);
        let inner = context::fork_future(async {
            yield_now().await;
            let seen = local.get("depth");
            local.set("depth", 2);
            seen
        });
        let seen_by_inner = inner.await;
        (seen_by_inner, local.get("depth"))
    });

    assert_eq!(block_on(outer), (Ok(1), Ok(1)));
    assert!(local.get("depth").unwrap_err().is_not_found());
}

#[test]
fn test_thread_critical_shared_between_tasks_on_one_thread() {
    let local = Local::new(true);

    let writer = context::fork_future(async {
        local.set("loop", true);
        yield_now().await;
    });
    let reader = context::fork_future(async {
        yield_now().await;
        local.get("loop")
    });

    let ((), seen) = block_on(async { futures::join!(writer, reader) });
    assert_eq!(seen, Ok(true));
}
