//! Serialized dispatch loop.
//!
//! One dedicated OS thread hands envelopes to the runtime one at a time. Submitters push
//! an envelope into a capacity-1 inbound queue and block on a capacity-1 outbound queue
//! for the resulting handle, so the n-th submission always receives the n-th handle.
//!
//! # Design Principles
//!
//! - **No polling**: the worker blocks on channel recv; submitters block on send/recv
//! - **Never blocked by user code**: the worker spawns each callable and moves on
//! - **Clean shutdown**: dropping the inbound sender unblocks the worker naturally

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::callable::{Arguments, SharedCallable};
use super::envelope::TaskEnvelope;
use super::error::BridgeError;
use super::task::{launch, TaskContext, TaskHandle};
use super::wake::WakePtr;

/// Settings for the dispatch worker thread.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Name given to the worker thread.
    pub thread_name: String,
    /// Stack size of the worker thread in bytes.
    pub stack_size: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            thread_name: "bridge-dispatch".to_string(),
            stack_size: 2 * 1024 * 1024,
        }
    }
}

/// Both ends of the queue pair held by submitters.
struct SubmitSide {
    inbound: Sender<TaskEnvelope>,
    outbound: Receiver<TaskHandle>,
}

/// The serialized dispatch loop and its submission side.
pub struct DispatchLoop {
    /// Queue pair; `None` once shut down. Held across push and pull so each submitter
    /// receives the handle of its own envelope.
    submit: Mutex<Option<SubmitSide>>,
    ctx: TaskContext,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DispatchLoop {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] if the worker thread cannot be spawned.
    pub(crate) fn start(
        runtime: Handle,
        ctx: TaskContext,
        ids: Arc<AtomicU64>,
        settings: &DispatchSettings,
    ) -> Result<Self, BridgeError> {
        let (inbound_tx, inbound_rx) = bounded::<TaskEnvelope>(1);
        let (outbound_tx, outbound_rx) = bounded::<TaskHandle>(1);

        let worker_ctx = ctx.clone();
        let worker = thread::Builder::new()
            .name(settings.thread_name.clone())
            .stack_size(settings.stack_size)
            .spawn(move || dispatch_worker(&runtime, &worker_ctx, &ids, &inbound_rx, &outbound_tx))
            .map_err(|e| BridgeError::Runtime(format!("failed to spawn dispatch thread: {e}")))?;

        info!(thread = %settings.thread_name, "Dispatch loop started");

        Ok(Self {
            submit: Mutex::new(Some(SubmitSide {
                inbound: inbound_tx,
                outbound: outbound_rx,
            })),
            ctx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Submit through the dispatch loop and block until its handle is published.
    ///
    /// Concurrent callers are served one at a time in the order they acquire the queue.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::WakeCallbackMissing`] if `wake` is set and no callback is installed
    /// - [`BridgeError::DispatchClosed`] if the loop has been shut down
    pub fn scheduleasync(
        &self,
        callable: SharedCallable,
        wake: Option<WakePtr>,
        args: Arguments,
    ) -> Result<TaskHandle, BridgeError> {
        self.ctx.registry.ensure_ready(wake)?;
        let envelope = TaskEnvelope::new(callable, args, wake);

        let submit = self.submit.lock();
        let Some(side) = submit.as_ref() else {
            return Err(BridgeError::DispatchClosed);
        };
        side.inbound
            .send(envelope)
            .map_err(|_| BridgeError::DispatchClosed)?;
        side.outbound.recv().map_err(|_| BridgeError::DispatchClosed)
    }

    /// Whether the loop still accepts envelopes.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.submit.lock().is_some()
    }

    /// Stop accepting envelopes and join the worker thread.
    ///
    /// Tasks already handed to the runtime keep running. The worker never waits on user
    /// code, so it exits as soon as the queue pair is released.
    pub fn shutdown(&self) {
        if self.submit.lock().take().is_none() {
            return;
        }
        info!("Shutting down dispatch loop");

        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        match worker.join() {
            Ok(()) => debug!("Dispatch worker joined"),
            Err(_) => warn!("Dispatch worker panicked"),
        }
    }
}

impl Drop for DispatchLoop {
    fn drop(&mut self) {
        // Dropping the sender unblocks the worker; it is not joined here.
        if self.submit.get_mut().take().is_some() {
            debug!("DispatchLoop dropped without explicit shutdown - worker will be detached");
        }
    }
}

/// Worker body: receive, spawn, publish, repeat.
fn dispatch_worker(
    runtime: &Handle,
    ctx: &TaskContext,
    ids: &AtomicU64,
    inbound: &Receiver<TaskEnvelope>,
    outbound: &Sender<TaskHandle>,
) {
    debug!("Dispatch worker started");

    // Ends only when every submitter has been dropped.
    while let Ok(envelope) = inbound.recv() {
        let (callable, args, wake) = envelope.into_parts();
        let id = ids.fetch_add(1, Ordering::Relaxed);
        ctx.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        debug!(
            task_id = id,
            callable = callable.name(),
            notify = wake.is_some(),
            "Dispatching envelope"
        );

        let handle = launch(runtime, ctx, id, callable, args, wake);
        if outbound.send(handle).is_err() {
            debug!(task_id = id, "Submitter gone before handle was published");
            break;
        }
    }

    debug!("Dispatch worker exiting");
}
