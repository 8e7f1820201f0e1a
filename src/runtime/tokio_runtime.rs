//! Tokio runtimes the bridge spawns onto.

use std::thread;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::core::BridgeError;

/// Parallel runtime plus the optional interactive and local runtimes.
///
/// Runtimes built here are owned and shut down in the background on drop; an attached
/// handle is borrowed and left running.
pub struct BridgeRuntime {
    parallel: Handle,
    interactive: Option<Handle>,
    local: Option<LocalDriver>,
    owned: Vec<Runtime>,
}

/// Current-thread runtime kept alive by one dedicated OS thread.
///
/// Every task spawned through `handle` runs on that thread.
struct LocalDriver {
    handle: Handle,
    stop: Option<oneshot::Sender<()>>,
}

impl LocalDriver {
    fn start(name: &str) -> Result<Self, BridgeError> {
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BridgeError::Runtime(format!("failed to build {name} runtime: {e}")))?;
        let handle = rt.handle().clone();
        let (stop, stopped) = oneshot::channel::<()>();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Either a stop signal or the sender being dropped ends the drive loop.
                let _ = rt.block_on(stopped);
                debug!("Local runtime stopping");
                // Dropping the runtime here drops any unfinished tasks on this thread.
                drop(rt);
            })
            .map_err(|e| BridgeError::Runtime(format!("failed to spawn {name} thread: {e}")))?;

        Ok(Self {
            handle,
            stop: Some(stop),
        })
    }
}

impl Drop for LocalDriver {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl BridgeRuntime {
    /// Build a multi-threaded runtime (and the interactive one, if configured).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] if a runtime cannot be built.
    pub fn build(cfg: &BridgeConfig) -> Result<Self, BridgeError> {
        let parallel = build_runtime(cfg.worker_threads, "bridge-worker")?;
        let mut runtime = Self::attach(parallel.handle().clone(), cfg)?;
        runtime.owned.push(parallel);
        info!(worker_threads = cfg.worker_threads, "Bridge runtime built");
        Ok(runtime)
    }

    /// Spawn onto an existing runtime; the interactive and local runtimes are still built
    /// if configured.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] if the interactive or local runtime cannot be built.
    pub fn attach(handle: Handle, cfg: &BridgeConfig) -> Result<Self, BridgeError> {
        let mut owned = Vec::new();
        let interactive = if cfg.interactive_threads > 0 {
            let rt = build_runtime(cfg.interactive_threads, "bridge-interactive")?;
            let handle = rt.handle().clone();
            owned.push(rt);
            info!(threads = cfg.interactive_threads, "Interactive runtime built");
            Some(handle)
        } else {
            None
        };
        let local = if cfg.local_pool {
            let driver = LocalDriver::start("bridge-local")?;
            info!("Local runtime started");
            Some(driver)
        } else {
            None
        };
        Ok(Self {
            parallel: handle,
            interactive,
            local,
            owned,
        })
    }

    /// Handle of the parallel runtime.
    #[must_use]
    pub const fn parallel(&self) -> &Handle {
        &self.parallel
    }

    /// Handle of the interactive runtime, if configured.
    #[must_use]
    pub const fn interactive(&self) -> Option<&Handle> {
        self.interactive.as_ref()
    }

    /// Handle of the single-threaded local runtime, if configured.
    #[must_use]
    pub fn local(&self) -> Option<&Handle> {
        self.local.as_ref().map(|driver| &driver.handle)
    }
}

impl Drop for BridgeRuntime {
    fn drop(&mut self) {
        // Background shutdown is safe from inside an async context.
        for rt in self.owned.drain(..) {
            rt.shutdown_background();
        }
    }
}

fn build_runtime(threads: usize, name: &str) -> Result<Runtime, BridgeError> {
    Builder::new_multi_thread()
        .worker_threads(threads)
        .thread_name(name)
        .enable_all()
        .build()
        .map_err(|e| BridgeError::Runtime(format!("failed to build {name} runtime: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_interactive_pool() {
        let cfg = BridgeConfig::new().with_worker_threads(1).with_local_pool(false);
        let runtime = BridgeRuntime::build(&cfg).unwrap();
        assert!(runtime.interactive().is_none());
        assert!(runtime.local().is_none());
        let value = runtime.parallel().block_on(async { 40 + 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_build_with_interactive_pool() {
        let cfg = BridgeConfig::new()
            .with_worker_threads(1)
            .with_interactive_threads(1);
        let runtime = BridgeRuntime::build(&cfg).unwrap();
        let interactive = runtime.interactive().unwrap();
        let name = interactive
            .block_on(async { tokio::spawn(async { std::thread::current().name().map(String::from) }).await })
            .unwrap();
        assert_eq!(name.as_deref(), Some("bridge-interactive"));
    }

    #[test]
    fn test_local_runtime_runs_on_its_own_thread() {
        let runtime = BridgeRuntime::build(&BridgeConfig::new().with_worker_threads(1)).unwrap();
        let local = runtime.local().unwrap();
        let names: Vec<_> = (0..3)
            .map(|_| local.spawn(async { std::thread::current().name().map(String::from) }))
            .collect();

        let parallel = runtime.parallel();
        for name in names {
            let name = parallel.block_on(name).unwrap();
            assert_eq!(name.as_deref(), Some("bridge-local"));
        }
    }
}
