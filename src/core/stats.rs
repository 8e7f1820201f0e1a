//! Submission and completion counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::registry::WakeRegistry;

/// Snapshot of bridge activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Tasks submitted through the direct spawn path (including the interactive and local
    /// pools).
    pub direct_submissions: u64,

    /// Envelopes consumed by the dispatch loop.
    pub dispatched: u64,

    /// Tasks whose callable returned a value.
    pub completed: u64,

    /// Tasks whose callable returned an error.
    pub failed: u64,

    /// Tasks whose callable panicked.
    pub panicked: u64,

    /// Wake callbacks delivered.
    pub notifications: u64,

    /// Wake pointers that could not be delivered because no callback was installed.
    pub missed_notifications: u64,
}

/// Internal counters for bridge statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct BridgeCounters {
    pub direct_submissions: AtomicU64,
    pub dispatched: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub panicked: AtomicU64,
}

impl BridgeCounters {
    /// Get a snapshot of current statistics; notification counts come from `registry`.
    pub fn snapshot(&self, registry: &WakeRegistry) -> BridgeStats {
        BridgeStats {
            direct_submissions: self.direct_submissions.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            notifications: registry.delivered(),
            missed_notifications: registry.missed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = BridgeStats::default();
        assert_eq!(stats.dispatched, 0);
        assert_eq!(stats.notifications, 0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = BridgeCounters::default();
        counters.dispatched.fetch_add(3, Ordering::Relaxed);
        counters.failed.fetch_add(1, Ordering::Relaxed);

        let stats = counters.snapshot(&WakeRegistry::new());
        assert_eq!(stats.dispatched, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.notifications, 0);
        assert_eq!(stats.completed, 0);
    }
}
