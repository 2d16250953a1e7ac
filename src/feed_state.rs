// =============================================================================
// Central service state — Aurora Feed Relay
// =============================================================================
//
// Ties the shared store, runtime configuration, and the structured error
// channel together. All subsystems hold Arc references; expected conditions
// (no FX rate yet, unknown channel) never land on the error channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::FeedError;
use crate::price_store::PriceStore;
use crate::runtime_config::RuntimeConfig;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event for the errors endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable taxonomy code (`frame_decode`, `sub_rejected`,
    /// `protocol`, `bootstrap`).
    pub code: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Shared service state, wrapped in `Arc` at startup.
pub struct FeedState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful mutation. Lets pollers detect fresh data cheaply.
    pub state_version: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub store: Arc<PriceStore>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Instant the service started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl FeedState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            store: Arc::new(PriceStore::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Record a feed error on the structured error channel. The ring is
    /// capped at [`MAX_RECENT_ERRORS`]; oldest entries are evicted.
    pub fn push_error(&self, err: &FeedError) {
        let record = ErrorRecord {
            message: err.to_string(),
            code: err.code().to_string(),
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_error_records_code_and_bumps_version() {
        let state = FeedState::new(RuntimeConfig::default());
        let before = state.current_state_version();

        state.push_error(&FeedError::FrameDecode("bad gzip".into()));

        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "frame_decode");
        assert!(errors[0].message.contains("bad gzip"));
        drop(errors);

        assert!(state.current_state_version() > before);
    }

    #[test]
    fn error_ring_is_capped() {
        let state = FeedState::new(RuntimeConfig::default());
        for i in 0..60 {
            state.push_error(&FeedError::FrameDecode(format!("frame {i}")));
        }

        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        // Oldest entries evicted first.
        assert!(errors[0].message.contains("frame 10"));
    }
}
