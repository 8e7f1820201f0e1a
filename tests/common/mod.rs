//! Shared helpers for bridge integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::ffi::c_void;

use multitask_bridge::config::BridgeConfig;
use multitask_bridge::core::WakePtr;
use multitask_bridge::Bridge;
use parking_lot::Mutex;

/// Every wake address delivered to [`record_wake`], in delivery order.
pub static WAKES: Mutex<Vec<usize>> = Mutex::new(Vec::new());

/// Wake addresses whose callable has returned (see [`mark_finished`]).
pub static FINISHED: Mutex<Option<HashSet<usize>>> = Mutex::new(None);

/// Wake addresses that were delivered before their callable had finished.
pub static EARLY_WAKES: Mutex<Vec<usize>> = Mutex::new(Vec::new());

/// Wake callback used by every test bridge.
pub extern "C" fn record_wake(ptr: *mut c_void) {
    let addr = ptr.addr();
    let finished = FINISHED
        .lock()
        .as_ref()
        .is_some_and(|set| set.contains(&addr));
    if !finished {
        EARLY_WAKES.lock().push(addr);
    }
    WAKES.lock().push(addr);
}

/// Record that the callable owning `addr` is about to return.
pub fn mark_finished(addr: usize) {
    FINISHED.lock().get_or_insert_with(HashSet::new).insert(addr);
}

/// How many times `addr` was delivered.
pub fn wake_count(addr: usize) -> usize {
    WAKES.lock().iter().filter(|&&a| a == addr).count()
}

/// Wake pointer for a test-chosen address.
pub fn wake(addr: usize) -> Option<WakePtr> {
    WakePtr::from_addr(addr)
}

/// Bridge with its own small runtime and the recording callback installed.
pub fn bridge() -> Bridge {
    multitask_bridge::util::init_tracing();
    let bridge = Bridge::new(BridgeConfig::new().with_worker_threads(4)).expect("bridge");
    bridge.install_wake_callback(record_wake);
    bridge
}
