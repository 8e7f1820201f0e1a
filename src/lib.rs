//! # Multitask Bridge
//!
//! A cross-runtime task scheduling bridge. An external caller, running on its own thread
//! outside the async runtime, submits callables to a tokio runtime, receives a handle to
//! the spawned task, and is told when the task has finished through a foreign wake
//! callback that receives the caller's own opaque pointer.
//!
//! ## Submission Paths
//!
//! - **Direct spawn** ([`Bridge::asynccall`]): schedules immediately on the parallel
//!   runtime. No ordering guarantee relative to other submissions.
//! - **Serialized dispatch** ([`Bridge::scheduleasync`]): a dedicated worker thread takes
//!   envelopes from a capacity-1 queue and hands back handles through another capacity-1
//!   queue, so submissions reach the runtime one at a time in FIFO order.
//! - **Interactive** ([`Bridge::interactivecall`]): like direct spawn, on a small separate
//!   runtime for latency-sensitive work.
//! - **Local** ([`Bridge::scheduleasync_local`]): like direct spawn, on a single-threaded
//!   runtime with its own thread, for callables that mostly wait on IO.
//!
//! ## Completion Notification
//!
//! When a wake pointer is supplied, the installed callback is invoked with it exactly once
//! after the callable has terminated, whether it returned, failed, or panicked. A task
//! dropped by a shut-down runtime before it ever ran is notified as well. The signal means
//! "finished", not "succeeded"; the outcome itself is observable by awaiting the
//! [`TaskHandle`](crate::core::TaskHandle).
//!
//! ```rust,ignore
//! use multitask_bridge::config::BridgeConfig;
//! use multitask_bridge::core::{from_fn, Arguments, WakePtr};
//! use multitask_bridge::Bridge;
//!
//! extern "C" fn on_done(ptr: *mut std::ffi::c_void) {
//!     // Runs on a runtime worker thread: signal the host's own domain from here.
//! }
//!
//! let bridge = Bridge::new(BridgeConfig::from_env()?)?;
//! bridge.install_wake_callback(on_done);
//!
//! let square = from_fn("square", |args: Arguments| {
//!     let n = args.arg(0).and_then(|v| v.as_i64()).unwrap_or_default();
//!     Ok((n * n).into())
//! });
//! let handle = bridge.scheduleasync(square, WakePtr::from_raw(host_ptr), Arguments::new().with_arg(7))?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Wake pointers, the registry, envelopes, and both submission paths.
pub mod core;
/// Configuration for runtimes and the dispatch worker.
pub mod config;
/// Runtime adapters and the bridge facade.
pub mod runtime;
/// Shared utilities: diagnostics and telemetry.
pub mod util;

pub use runtime::Bridge;
