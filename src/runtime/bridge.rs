//! The bridge facade used by the external caller.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tracing::info;

use super::tokio_runtime::BridgeRuntime;
use crate::config::BridgeConfig;
use crate::core::stats::BridgeCounters;
use crate::core::task::TaskContext;
use crate::core::{
    Arguments, BridgeError, BridgeStats, DirectSpawner, DispatchLoop, SharedCallable, TaskError,
    TaskHandle, WakeCallback, WakePtr, WakeRegistry,
};

/// Entry point for an external caller submitting work to the runtime.
///
/// # Example
///
/// ```rust,ignore
/// use multitask_bridge::config::BridgeConfig;
/// use multitask_bridge::core::{from_fn, Arguments, WakePtr};
/// use multitask_bridge::runtime::Bridge;
///
/// extern "C" fn on_done(ptr: *mut std::ffi::c_void) { /* signal the host */ }
///
/// let bridge = Bridge::new(BridgeConfig::new().with_worker_threads(4))?;
/// bridge.install_wake_callback(on_done);
///
/// let task = from_fn("answer", |_| Ok(42.into()));
/// let handle = bridge.scheduleasync(task, WakePtr::from_raw(host_ptr), Arguments::new())?;
/// ```
pub struct Bridge {
    registry: Arc<WakeRegistry>,
    counters: Arc<BridgeCounters>,
    direct: DirectSpawner,
    interactive: Option<DirectSpawner>,
    local: Option<DirectSpawner>,
    dispatch: DispatchLoop,
    // Dropped last so tasks are torn down after the dispatch worker is released.
    runtime: BridgeRuntime,
}

impl Bridge {
    /// Build a bridge that owns its runtimes.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidConfig`] if `config` does not validate
    /// - [`BridgeError::Runtime`] if a runtime or the dispatch thread cannot be started
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate().map_err(BridgeError::InvalidConfig)?;
        let runtime = BridgeRuntime::build(&config)?;
        Self::assemble(runtime, &config)
    }

    /// Build a bridge that spawns onto an existing runtime.
    ///
    /// # Errors
    ///
    /// Same as [`Bridge::new`].
    pub fn with_handle(handle: Handle, config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate().map_err(BridgeError::InvalidConfig)?;
        let runtime = BridgeRuntime::attach(handle, &config)?;
        Self::assemble(runtime, &config)
    }

    fn assemble(runtime: BridgeRuntime, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let registry = Arc::new(WakeRegistry::new());
        registry.install_color_flag(config.color);
        let counters = Arc::new(BridgeCounters::default());
        let ctx = TaskContext {
            registry: Arc::clone(&registry),
            counters: Arc::clone(&counters),
        };
        let ids = Arc::new(AtomicU64::new(0));

        let direct = DirectSpawner::new(
            runtime.parallel().clone(),
            ctx.clone(),
            Arc::clone(&ids),
            "default",
        );
        let interactive = runtime.interactive().map(|handle| {
            DirectSpawner::new(handle.clone(), ctx.clone(), Arc::clone(&ids), "interactive")
        });
        let local = runtime.local().map(|handle| {
            DirectSpawner::new(handle.clone(), ctx.clone(), Arc::clone(&ids), "local")
        });
        let dispatch = DispatchLoop::start(
            runtime.parallel().clone(),
            ctx,
            ids,
            &config.dispatch_settings(),
        )?;

        info!(
            interactive = interactive.is_some(),
            local = local.is_some(),
            color = config.color,
            "Bridge initialized"
        );

        Ok(Self {
            registry,
            counters,
            direct,
            interactive,
            local,
            dispatch,
            runtime,
        })
    }

    /// Install the wake callback. Call before submitting with a wake pointer.
    pub fn install_wake_callback(&self, callback: WakeCallback) {
        self.registry.install_wake_callback(callback);
    }

    /// Enable or disable color sequences in rendered errors.
    pub fn install_color_flag(&self, enabled: bool) {
        self.registry.install_color_flag(enabled);
    }

    /// Shared registry, for components that notify or render on their own.
    #[must_use]
    pub const fn registry(&self) -> &Arc<WakeRegistry> {
        &self.registry
    }

    /// Schedule `callable` immediately on the parallel runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WakeCallbackMissing`] if `wake` is set before a callback
    /// was installed.
    pub fn asynccall(
        &self,
        callable: SharedCallable,
        wake: Option<WakePtr>,
        args: Arguments,
    ) -> Result<TaskHandle, BridgeError> {
        self.direct.asynccall(callable, wake, args)
    }

    /// Schedule `callable` immediately on the interactive runtime.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InteractivePoolDisabled`] if no interactive runtime is configured
    /// - [`BridgeError::WakeCallbackMissing`] as for [`Bridge::asynccall`]
    pub fn interactivecall(
        &self,
        callable: SharedCallable,
        wake: Option<WakePtr>,
        args: Arguments,
    ) -> Result<TaskHandle, BridgeError> {
        self.interactive
            .as_ref()
            .ok_or(BridgeError::InteractivePoolDisabled)?
            .asynccall(callable, wake, args)
    }

    /// Schedule `callable` on the single-threaded local runtime.
    ///
    /// All local submissions share one thread, so this suits callables that mostly wait
    /// on IO. Same wake contract as [`Bridge::asynccall`].
    ///
    /// # Errors
    ///
    /// - [`BridgeError::LocalPoolDisabled`] if the local runtime is not configured
    /// - [`BridgeError::WakeCallbackMissing`] as for [`Bridge::asynccall`]
    pub fn scheduleasync_local(
        &self,
        callable: SharedCallable,
        wake: Option<WakePtr>,
        args: Arguments,
    ) -> Result<TaskHandle, BridgeError> {
        self.local
            .as_ref()
            .ok_or(BridgeError::LocalPoolDisabled)?
            .asynccall(callable, wake, args)
    }

    /// Submit through the serialized dispatch loop; blocks until the handle is available.
    ///
    /// Must not be called from a runtime worker thread without `block_in_place`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::WakeCallbackMissing`] as for [`Bridge::asynccall`]
    /// - [`BridgeError::DispatchClosed`] after [`Bridge::shutdown`]
    pub fn scheduleasync(
        &self,
        callable: SharedCallable,
        wake: Option<WakePtr>,
        args: Arguments,
    ) -> Result<TaskHandle, BridgeError> {
        self.dispatch.scheduleasync(callable, wake, args)
    }

    /// Block the calling (non-runtime) thread until `handle` resolves.
    ///
    /// # Errors
    ///
    /// Returns the task's [`TaskError`] if it failed, panicked, or was cancelled.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a tokio runtime, which is easy to do by accident
    /// with [`Bridge::with_handle`]. Await the handle there instead.
    pub fn wait(&self, handle: TaskHandle) -> Result<Value, TaskError> {
        self.runtime.parallel().block_on(handle)
    }

    /// Render a value preview.
    #[must_use]
    pub fn render_value(&self, value: &Value) -> String {
        self.registry.render_value(value)
    }

    /// Render a failure, honoring the color flag.
    #[must_use]
    pub fn render_error(&self, err: &anyhow::Error) -> String {
        self.registry.render_error(err)
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        self.counters.snapshot(&self.registry)
    }

    /// Whether the interactive runtime is available.
    #[must_use]
    pub const fn has_interactive_pool(&self) -> bool {
        self.interactive.is_some()
    }

    /// Whether the local runtime is available.
    #[must_use]
    pub const fn has_local_pool(&self) -> bool {
        self.local.is_some()
    }

    /// Stop the dispatch loop. Direct submissions keep working until the bridge is dropped.
    pub fn shutdown(&self) {
        self.dispatch.shutdown();
    }
}
