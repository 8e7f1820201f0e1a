//! Shared utilities.

pub mod diagnostics;
pub mod telemetry;

pub use diagnostics::{logged, render_error, render_value, traced, TracedFailure};
pub use telemetry::init_tracing;
