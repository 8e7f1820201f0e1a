//! Wake callback registry.
//!
//! Holds the single foreign notification function and the color flag. The host installs
//! both once at startup; afterwards the registry is only read. It is shared explicitly
//! (`Arc<WakeRegistry>`) with every component that needs it rather than living in a global.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, trace};

use super::error::BridgeError;
use super::wake::{WakeCallback, WakePtr};
use crate::util::diagnostics;

/// Single-slot holder for the wake callback and the color flag.
#[derive(Debug, Default)]
pub struct WakeRegistry {
    callback: RwLock<Option<WakeCallback>>,
    color: AtomicBool,
    delivered: AtomicU64,
    missed: AtomicU64,
}

impl WakeRegistry {
    /// Create an empty registry: no callback, colors disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the wake callback. A later install replaces the earlier one.
    pub fn install_wake_callback(&self, callback: WakeCallback) {
        let previous = self.callback.write().replace(callback);
        if previous.is_some() {
            debug!("Wake callback replaced");
        } else {
            debug!("Wake callback installed");
        }
    }

    /// Enable or disable color sequences in rendered errors.
    pub fn install_color_flag(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Release);
    }

    /// Whether rendered errors include color sequences.
    #[must_use]
    pub fn color_enabled(&self) -> bool {
        self.color.load(Ordering::Acquire)
    }

    /// Whether a wake callback has been installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.callback.read().is_some()
    }

    /// Submission-time guard: a wake pointer requires an installed callback.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WakeCallbackMissing`] if `wake` is set and no callback
    /// has been installed yet.
    pub fn ensure_ready(&self, wake: Option<WakePtr>) -> Result<(), BridgeError> {
        if wake.is_some() && !self.is_installed() {
            return Err(BridgeError::WakeCallbackMissing);
        }
        Ok(())
    }

    /// Invoke the installed callback with `wake`.
    ///
    /// Without an installed callback this is a no-op that logs and counts the missed
    /// notification.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WakeCallbackMissing`] if no callback is installed.
    pub fn notify(&self, wake: WakePtr) -> Result<(), BridgeError> {
        // Copy the fn pointer out so the lock is not held across foreign code.
        let callback = *self.callback.read();
        let Some(callback) = callback else {
            self.missed.fetch_add(1, Ordering::Relaxed);
            error!(wake = ?wake, "Wake notification dropped: no callback installed");
            return Err(BridgeError::WakeCallbackMissing);
        };
        trace!(wake = ?wake, "Delivering wake notification");
        callback(wake.as_raw());
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Notifications delivered so far.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Notifications dropped because no callback was installed.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    /// Render a value preview.
    #[must_use]
    pub fn render_value(&self, value: &Value) -> String {
        diagnostics::render_value(value)
    }

    /// Render a failure, honoring the color flag.
    #[must_use]
    pub fn render_error(&self, err: &anyhow::Error) -> String {
        diagnostics::render_error(err, self.color_enabled())
    }
}
