//! Configuration models for the bridge runtime and dispatch worker.

pub mod bridge;

pub use bridge::BridgeConfig;
