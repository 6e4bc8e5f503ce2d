//! Fault taxonomy shared across the control core.
//!
//! Faults are states, not control-flow errors: a cycle can carry several
//! at once and none of them is fatal to the loop. Config faults are
//! recovered by loading safe defaults, sensor/fix faults by mode
//! downgrade and command hold, deadline misses by reporting only (there
//! is no retry for a periodic task, only the next period).

use bitflags::bitflags;

bitflags! {
    /// Active fault conditions for one control cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FaultFlags: u8 {
        /// Persisted configuration failed its integrity check.
        const CONFIG_INTEGRITY = 1 << 0;
        /// Persisted configuration carries an unsupported version.
        const CONFIG_VERSION = 1 << 1;
        /// A consumed sensor group is stale or non-finite.
        const SENSOR_STALE = 1 << 2;
        /// The measured cycle period exceeded its tolerance.
        const DEADLINE_MISS = 1 << 3;
        /// GPS fix quality dropped below what the active mode requires.
        const FIX_LOSS = 1 << 4;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_accumulate_and_query() {
        let mut faults = FaultFlags::empty();
        faults |= FaultFlags::SENSOR_STALE;
        faults |= FaultFlags::FIX_LOSS;
        assert!(faults.contains(FaultFlags::SENSOR_STALE));
        assert!(faults.contains(FaultFlags::FIX_LOSS));
        assert!(!faults.contains(FaultFlags::DEADLINE_MISS));
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(FaultFlags::default(), FaultFlags::empty());
    }
}
