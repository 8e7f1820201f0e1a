//! Direct spawn path.
//!
//! Schedules a callable on the parallel scheduler immediately and returns its handle.
//! Cheaper than the dispatch loop, but gives no ordering guarantee relative to other
//! submissions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use super::callable::{Arguments, SharedCallable};
use super::error::BridgeError;
use super::task::{launch, TaskContext, TaskHandle};
use super::wake::WakePtr;

/// Spawner for the direct path, bound to one runtime.
#[derive(Clone)]
pub struct DirectSpawner {
    handle: Handle,
    ctx: TaskContext,
    ids: Arc<AtomicU64>,
    pool: &'static str,
}

impl DirectSpawner {
    pub(crate) const fn new(
        handle: Handle,
        ctx: TaskContext,
        ids: Arc<AtomicU64>,
        pool: &'static str,
    ) -> Self {
        Self {
            handle,
            ctx,
            ids,
            pool,
        }
    }

    /// Schedule `callable` now; notify `wake` once it terminates.
    ///
    /// Returns as soon as the task is scheduled, not when it finishes.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WakeCallbackMissing`] if `wake` is set and no wake callback
    /// has been installed. Nothing is scheduled in that case.
    pub fn asynccall(
        &self,
        callable: SharedCallable,
        wake: Option<WakePtr>,
        args: Arguments,
    ) -> Result<TaskHandle, BridgeError> {
        self.ctx.registry.ensure_ready(wake)?;

        let id = self.ids.fetch_add(1, Ordering::Relaxed);
        self.ctx.counters.direct_submissions.fetch_add(1, Ordering::Relaxed);
        debug!(
            task_id = id,
            pool = self.pool,
            callable = callable.name(),
            notify = wake.is_some(),
            "Direct spawn"
        );
        Ok(launch(&self.handle, &self.ctx, id, callable, args, wake))
    }

    /// Name of the pool this spawner targets.
    #[must_use]
    pub const fn pool(&self) -> &'static str {
        self.pool
    }
}
