//! Task handles and the runner shared by both submission paths.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::callable::{Arguments, SharedCallable};
use super::error::{AppResult, TaskError};
use super::registry::WakeRegistry;
use super::stats::BridgeCounters;
use super::wake::{WakeGuard, WakePtr};
use crate::util::diagnostics;

/// Task identifier, unique per bridge and increasing in submission order.
pub type TaskId = u64;

/// Handle to a callable scheduled on the runtime.
///
/// Completion is normally signalled to the external caller through the wake callback; the
/// handle additionally lets runtime-side code await the value or the failure.
pub struct TaskHandle {
    id: TaskId,
    notifies: bool,
    inner: JoinHandle<AppResult<Value>>,
}

impl TaskHandle {
    /// Identifier assigned at scheduling time.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Whether a wake pointer was supplied for this task. The pointer itself is owned by
    /// the running task and released with its single notification.
    #[must_use]
    pub const fn notifies(&self) -> bool {
        self.notifies
    }

    /// Whether the task has terminated.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("notifies", &self.notifies)
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl Future for TaskHandle {
    type Output = Result<Value, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().inner).poll(cx).map(|joined| match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(TaskError::Failed(err)),
            Err(join_err) if join_err.is_panic() => {
                Err(TaskError::Panicked(panic_message(join_err.into_panic())))
            }
            Err(_) => Err(TaskError::Cancelled),
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Everything a spawned task needs besides the callable itself.
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub registry: Arc<WakeRegistry>,
    pub counters: Arc<BridgeCounters>,
}

/// Spawn `callable` on `runtime`, notifying `wake` when it terminates.
///
/// The guard is moved into the spawned future, so a task the runtime drops before its
/// first poll still notifies.
pub(crate) fn launch(
    runtime: &Handle,
    ctx: &TaskContext,
    id: TaskId,
    callable: SharedCallable,
    args: Arguments,
    wake: Option<WakePtr>,
) -> TaskHandle {
    let guard = WakeGuard::new(wake, Arc::clone(&ctx.registry));
    let ctx = ctx.clone();
    let inner = runtime.spawn(async move {
        // Bound first so it drops last, after the outcome has been recorded.
        let _wake = guard;
        run(ctx, id, callable, args).await
    });
    TaskHandle {
        id,
        notifies: wake.is_some(),
        inner,
    }
}

async fn run(
    ctx: TaskContext,
    id: TaskId,
    callable: SharedCallable,
    args: Arguments,
) -> AppResult<Value> {
    let _panics = PanicCounter(&ctx.counters);

    debug!(task_id = id, callable = callable.name(), "Task started");
    let outcome = callable.call(args).await;

    match &outcome {
        Ok(_) => {
            ctx.counters.completed.fetch_add(1, Ordering::Relaxed);
            debug!(task_id = id, "Task completed");
        }
        Err(err) => {
            ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                task_id = id,
                error = %diagnostics::render_error(err, false),
                "Task failed"
            );
        }
    }
    outcome
}

/// Counts a panic if dropped while unwinding out of the callable.
struct PanicCounter<'a>(&'a BridgeCounters);

impl Drop for PanicCounter<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.panicked.fetch_add(1, Ordering::Relaxed);
            warn!("Task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::callable::{from_async_fn, from_fn};
    use serde_json::json;

    fn explode() -> AppResult<Value> {
        panic!("kaboom")
    }

    fn context() -> TaskContext {
        TaskContext {
            registry: Arc::new(WakeRegistry::new()),
            counters: Arc::new(BridgeCounters::default()),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handle_resolves_to_value() {
        let ctx = context();
        let echo = from_fn("echo", |args: Arguments| Ok(args.arg(0).cloned().unwrap_or_default()));
        let handle = launch(&Handle::current(), &ctx, 7, echo, Arguments::positional([json!("hi")]), None);

        assert_eq!(handle.id(), 7);
        assert_eq!(handle.await.unwrap(), json!("hi"));
        assert_eq!(ctx.counters.snapshot(&ctx.registry).completed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handle_reports_failure() {
        let ctx = context();
        let boom = from_fn("boom", |_| Err(anyhow::anyhow!("boom")));
        let handle = launch(&Handle::current(), &ctx, 1, boom, Arguments::new(), None);

        let err = handle.await.unwrap_err();
        assert!(matches!(err, TaskError::Failed(_)));
        assert_eq!(ctx.counters.snapshot(&ctx.registry).failed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handle_reports_panic() {
        let ctx = context();
        let bad = from_async_fn("bad", |_| async { explode() });
        let handle = launch(&Handle::current(), &ctx, 2, bad, Arguments::new(), None);

        match handle.await {
            Err(TaskError::Panicked(msg)) => assert_eq!(msg, "kaboom"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(ctx.counters.snapshot(&ctx.registry).panicked, 1);
    }

    extern "C" fn ignore_wake(_: *mut std::ffi::c_void) {}

    #[test]
    fn test_unpolled_task_still_notifies() {
        let ctx = context();
        ctx.registry.install_wake_callback(ignore_wake);
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let handle = rt.handle().clone();
        rt.shutdown_timeout(std::time::Duration::from_millis(100));

        let noop = from_fn("noop", |_| Ok(Value::Null));
        let task = launch(&handle, &ctx, 3, noop, Arguments::new(), WakePtr::from_addr(0xA_0000));
        assert!(task.notifies());

        let outcome = futures::executor::block_on(task);
        assert!(matches!(outcome, Err(TaskError::Cancelled)), "{outcome:?}");
        assert_eq!(ctx.registry.delivered(), 1);
        assert_eq!(ctx.counters.snapshot(&ctx.registry).completed, 0);
    }
}
