//! Runtime adapters and the bridge facade.

pub mod bridge;
pub mod tokio_runtime;

pub use bridge::Bridge;
pub use tokio_runtime::BridgeRuntime;
