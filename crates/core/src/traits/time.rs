//! Time abstraction for the fixed-period control task.
//!
//! The control cycle measures its own inter-cycle interval instead of
//! assuming the nominal period, so it needs a monotonic microsecond clock.
//! `MockTime` gives tests full control over that clock.

use core::cell::Cell;

/// Monotonic time source for dt measurement and staleness checks.
pub trait TimeSource: Clone {
    /// Current time in microseconds since system start.
    fn now_us(&self) -> u64;

    /// Current time in milliseconds since system start.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Elapsed microseconds since a reference point, saturating at zero.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Controllable time source for host tests.
///
/// # Example
///
/// ```
/// use quad_pilot_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// time.advance(2_000); // one 500 Hz period
/// assert_eq!(time.now_us(), 2_000);
/// ```
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: Cell<u64>,
}

impl MockTime {
    /// Creates a clock starting at time 0.
    pub fn new() -> Self {
        Self {
            current_us: Cell::new(0),
        }
    }

    /// Creates a clock starting at the given time.
    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advances the clock by `us` microseconds.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}
