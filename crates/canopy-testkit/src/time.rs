//! Controllable clock for deterministic TTL and debounce tests

use canopy_core::TimeSource;
use parking_lot::Mutex;
use std::sync::Arc;

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ControllableClock {
    current_ms: Arc<Mutex<u64>>,
}

impl ControllableClock {
    /// Create a clock starting at the given timestamp
    pub fn new(initial_ms: u64) -> Self {
        Self {
            current_ms: Arc::new(Mutex::new(initial_ms)),
        }
    }

    /// Advance time by the given number of milliseconds
    pub fn advance(&self, ms: u64) {
        *self.current_ms.lock() += ms;
    }

    /// Set absolute time
    pub fn set(&self, ms: u64) {
        *self.current_ms.lock() = ms;
    }
}

impl TimeSource for ControllableClock {
    fn now_ms(&self) -> u64 {
        *self.current_ms.lock()
    }
}
