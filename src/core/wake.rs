//! Opaque wake pointers and the guard that delivers them.
//!
//! A [`WakePtr`] is an address owned by the external caller. The bridge never reads
//! through it; it only hands it back, once, to the installed [`WakeCallback`] when the
//! associated task has terminated.

use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use super::registry::WakeRegistry;

/// Foreign notification function, invoked with the caller's wake pointer.
pub type WakeCallback = extern "C" fn(*mut c_void);

/// Non-null opaque address supplied by the external caller.
///
/// Stored as the exposed address so it can cross threads freely; the bridge never
/// dereferences, frees, or retains it past the single notification.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WakePtr(NonZeroUsize);

impl WakePtr {
    /// Wrap a raw pointer. A null pointer means "no notification requested".
    #[must_use]
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr.expose_provenance()).map(Self)
    }

    /// Wrap a plain address. Zero means "no notification requested".
    #[must_use]
    pub const fn from_addr(addr: usize) -> Option<Self> {
        match NonZeroUsize::new(addr) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// The address as handed in.
    #[must_use]
    pub const fn addr(self) -> usize {
        self.0.get()
    }

    /// Rebuild the raw pointer for the foreign callback.
    #[must_use]
    pub fn as_raw(self) -> *mut c_void {
        std::ptr::with_exposed_provenance_mut(self.0.get())
    }
}

impl fmt::Debug for WakePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WakePtr({:#x})", self.0.get())
    }
}

/// Fires the wake notification when dropped.
///
/// Held across the execution of a callable so the notification is delivered on every
/// exit path: normal return, error, panic unwinding, or the runtime dropping the task.
pub(crate) struct WakeGuard {
    wake: Option<WakePtr>,
    registry: Arc<WakeRegistry>,
}

impl WakeGuard {
    pub(crate) const fn new(wake: Option<WakePtr>, registry: Arc<WakeRegistry>) -> Self {
        Self { wake, registry }
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        if let Some(wake) = self.wake.take() {
            // Missing callbacks are logged and counted by the registry.
            let _ = self.registry.notify(wake);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_pointer_means_no_wake() {
        assert!(WakePtr::from_raw(std::ptr::null_mut()).is_none());
        assert!(WakePtr::from_addr(0).is_none());
    }

    #[test]
    fn test_address_passes_through_unchanged() {
        let mut slot = 0_u8;
        let raw = std::ptr::addr_of_mut!(slot).cast::<c_void>();
        let wake = WakePtr::from_raw(raw).unwrap();
        assert_eq!(wake.as_raw(), raw);
        assert_eq!(wake.addr(), raw as usize);
    }

    #[test]
    fn test_debug_is_hex() {
        let wake = WakePtr::from_addr(0xbeef).unwrap();
        assert_eq!(format!("{wake:?}"), "WakePtr(0xbeef)");
    }
}
