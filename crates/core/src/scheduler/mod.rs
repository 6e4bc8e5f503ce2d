//! Cycle timing statistics and deadline accounting.
//!
//! The control task has no retry concept: a late cycle is simply late,
//! and the only correct response is to report it. These counters give
//! the surrounding system the numbers it needs to raise an operational
//! alarm on repeated misses.

/// Nominal control rate in Hz.
pub const CONTROL_RATE_HZ: u32 = 500;

/// Nominal control period in microseconds.
pub const CONTROL_PERIOD_US: u32 = 1_000_000 / CONTROL_RATE_HZ;

/// Allowed period deviation before a cycle counts as a deadline miss.
///
/// 5% of the nominal period, matching ordinary scheduler jitter.
pub const PERIOD_TOLERANCE_US: u32 = CONTROL_PERIOD_US / 20;

/// Runtime statistics for the periodic control task.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    /// Last measured inter-cycle period in microseconds.
    pub last_period_us: u32,
    /// Average period jitter in microseconds (EMA, alpha = 0.1).
    pub avg_jitter_us: u32,
    /// Worst period observed in microseconds.
    pub max_period_us: u32,
    /// Cycles whose period exceeded the tolerance.
    pub deadline_misses: u32,
    /// Total cycles recorded.
    pub cycle_count: u64,
}

impl CycleStats {
    /// Records one measured period against the nominal one.
    ///
    /// Returns `true` when this cycle missed its deadline.
    pub fn record(&mut self, period_us: u32, target_period_us: u32) -> bool {
        self.last_period_us = period_us;
        self.cycle_count = self.cycle_count.saturating_add(1);

        if period_us > self.max_period_us {
            self.max_period_us = period_us;
        }

        let jitter = period_us.abs_diff(target_period_us);
        if self.avg_jitter_us == 0 {
            self.avg_jitter_us = jitter;
        } else {
            self.avg_jitter_us = (jitter + 9 * self.avg_jitter_us) / 10;
        }

        let missed = period_us > target_period_us + PERIOD_TOLERANCE_US;
        if missed {
            self.deadline_misses = self.deadline_misses.saturating_add(1);
        }
        missed
    }

    /// Resets all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
