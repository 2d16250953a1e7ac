// =============================================================================
// Liveness Monitor — stalled-feed detection
// =============================================================================
//
// An open connection says nothing about whether data is still flowing; an
// exchange can keep the socket up and silently stop sending ticks. This
// counter is the only signal the supervisor has for that case.
//
// The monitor is a counter rather than a boolean so that several updates
// landing between two polls are indistinguishable from one, never from zero.

use std::sync::atomic::{AtomicU64, Ordering};

/// Update counter owned by one adapter instance.
#[derive(Debug, Default)]
pub struct LivenessMonitor {
    updates: AtomicU64,
}

impl LivenessMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accepted update (bootstrap completion or a normalized tick).
    pub fn mark(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Has anything arrived since the last poll? Atomically resets, so each
    /// burst of updates is reported as alive exactly once.
    pub fn poll(&self) -> bool {
        self.updates.swap(0, Ordering::AcqRel) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_dead() {
        let monitor = LivenessMonitor::new();
        assert!(!monitor.poll());
    }

    #[test]
    fn reports_alive_exactly_once_per_update() {
        let monitor = LivenessMonitor::new();
        monitor.mark();
        assert!(monitor.poll());
        assert!(!monitor.poll());
        assert!(!monitor.poll());
    }

    #[test]
    fn multiple_updates_collapse_into_one_poll() {
        let monitor = LivenessMonitor::new();
        monitor.mark();
        monitor.mark();
        monitor.mark();
        assert!(monitor.poll());
        assert!(!monitor.poll());
    }

    #[test]
    fn alive_again_after_new_update() {
        let monitor = LivenessMonitor::new();
        monitor.mark();
        assert!(monitor.poll());
        monitor.mark();
        assert!(monitor.poll());
        assert!(!monitor.poll());
    }
}
