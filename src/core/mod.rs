//! Core bridge abstractions: wake pointers, the registry, envelopes, and both
//! submission paths.

pub mod callable;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod spawn;
pub mod stats;
pub mod task;
pub mod wake;

pub use callable::{
    from_async_fn, from_fn, Arguments, AsyncFnCallable, Callable, FnCallable, SharedCallable,
};
pub use dispatch::{DispatchLoop, DispatchSettings};
pub use envelope::TaskEnvelope;
pub use error::{AppResult, BridgeError, TaskError};
pub use registry::WakeRegistry;
pub use spawn::DirectSpawner;
pub use stats::BridgeStats;
pub use task::{TaskHandle, TaskId};
pub use wake::{WakeCallback, WakePtr};
