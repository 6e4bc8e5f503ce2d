//! Multi-rate sensor aggregate consumed by the control core.
//!
//! The fusion/calibration stage (external to this crate) owns the
//! snapshot: each sub-vector is written at its own rate and stamped with
//! a freshness timestamp. The control core reads the whole snapshot as
//! an immutable view of latest-known values; a sub-vector whose stamp
//! has aged past its rate's tolerance is a fault, never silently used.

mod heading;

pub use heading::{heading_from_mag, wrap_180, wrap_360, Heading};

/// Index of the roll axis in body-frame 3-vectors.
pub const ROLL: usize = 0;
/// Index of the pitch axis in body-frame 3-vectors.
pub const PITCH: usize = 1;
/// Index of the yaw axis in body-frame 3-vectors.
pub const YAW: usize = 2;

/// The four independent update rates feeding the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    /// 500 Hz inertial group: raw accel, attitude, angular rate.
    Inertial500Hz,
    /// 100 Hz filtered acceleration.
    FilteredAccel100Hz,
    /// 10 Hz magnetometer.
    Mag10Hz,
    /// 50 Hz pressure altitude.
    Baro50Hz,
}

impl SampleRate {
    /// Nominal delivery period in microseconds.
    pub const fn nominal_period_us(self) -> u64 {
        match self {
            SampleRate::Inertial500Hz => 2_000,
            SampleRate::FilteredAccel100Hz => 10_000,
            SampleRate::Mag10Hz => 100_000,
            SampleRate::Baro50Hz => 20_000,
        }
    }

    /// Maximum stamp age before the group counts as stale.
    ///
    /// One nominal period of delivery plus one period of grace, so
    /// ordinary producer/consumer phase jitter does not trip the fault.
    pub const fn staleness_limit_us(self) -> u64 {
        2 * self.nominal_period_us()
    }
}

/// Latest-known sensor values at cycle time.
///
/// Angles in radians, rates in rad/s, altitude in meters. Each group
/// carries the timestamp of its last write.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorSnapshot {
    /// Raw body-frame acceleration, 500 Hz.
    pub accel_500hz: [f32; 3],
    /// Filtered body-frame acceleration, 100 Hz.
    pub accel_100hz: [f32; 3],
    /// Fused attitude (roll, pitch, yaw), 500 Hz.
    pub attitude_500hz: [f32; 3],
    /// Body-frame angular rate, 500 Hz.
    pub gyro_500hz: [f32; 3],
    /// Magnetic field vector, 10 Hz.
    pub mag_10hz: [f32; 3],
    /// Pressure-derived altitude, 50 Hz.
    pub pressure_alt_50hz: f32,

    /// Stamp of the last 500 Hz inertial write.
    pub inertial_stamp_us: u64,
    /// Stamp of the last 100 Hz filtered-accel write.
    pub accel_100hz_stamp_us: u64,
    /// Stamp of the last 10 Hz magnetometer write.
    pub mag_stamp_us: u64,
    /// Stamp of the last 50 Hz baro write.
    pub baro_stamp_us: u64,
}

impl SensorSnapshot {
    fn stamp_us(&self, rate: SampleRate) -> u64 {
        match rate {
            SampleRate::Inertial500Hz => self.inertial_stamp_us,
            SampleRate::FilteredAccel100Hz => self.accel_100hz_stamp_us,
            SampleRate::Mag10Hz => self.mag_stamp_us,
            SampleRate::Baro50Hz => self.baro_stamp_us,
        }
    }

    /// True when the group's stamp has aged past its tolerance.
    pub fn is_stale(&self, rate: SampleRate, now_us: u64) -> bool {
        now_us.saturating_sub(self.stamp_us(rate)) > rate.staleness_limit_us()
    }

    /// 500 Hz inertial group is fresh and finite.
    ///
    /// Any NaN/Inf in the attitude or rate vectors counts as stale: a
    /// non-finite value must never reach a PID stage.
    pub fn inertial_usable(&self, now_us: u64) -> bool {
        !self.is_stale(SampleRate::Inertial500Hz, now_us)
            && finite3(&self.attitude_500hz)
            && finite3(&self.gyro_500hz)
            && finite3(&self.accel_500hz)
    }

    /// 50 Hz pressure altitude is fresh and finite.
    pub fn baro_usable(&self, now_us: u64) -> bool {
        !self.is_stale(SampleRate::Baro50Hz, now_us) && self.pressure_alt_50hz.is_finite()
    }

    /// 10 Hz magnetometer group is fresh and finite.
    pub fn mag_usable(&self, now_us: u64) -> bool {
        !self.is_stale(SampleRate::Mag10Hz, now_us) && finite3(&self.mag_10hz)
    }
}

fn finite3(v: &[f32; 3]) -> bool {
    v[0].is_finite() && v[1].is_finite() && v[2].is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_snapshot(now_us: u64) -> SensorSnapshot {
        SensorSnapshot {
            inertial_stamp_us: now_us,
            accel_100hz_stamp_us: now_us,
            mag_stamp_us: now_us,
            baro_stamp_us: now_us,
            ..Default::default()
        }
    }

    #[test]
    fn fresh_groups_are_usable() {
        let snap = fresh_snapshot(1_000_000);
        assert!(snap.inertial_usable(1_000_000));
        assert!(snap.baro_usable(1_000_000));
        assert!(snap.mag_usable(1_000_000));
    }

    #[test]
    fn staleness_tracks_owning_rate() {
        let snap = fresh_snapshot(0);
        // 5 ms: past the inertial tolerance (4 ms), inside baro's (40 ms)
        assert!(snap.is_stale(SampleRate::Inertial500Hz, 5_000));
        assert!(!snap.is_stale(SampleRate::Baro50Hz, 5_000));
        // 250 ms: everything has lapsed, including the 10 Hz mag
        assert!(snap.is_stale(SampleRate::Mag10Hz, 250_000));
    }

    #[test]
    fn staleness_boundary_is_exclusive() {
        let snap = fresh_snapshot(0);
        let limit = SampleRate::Inertial500Hz.staleness_limit_us();
        assert!(!snap.is_stale(SampleRate::Inertial500Hz, limit));
        assert!(snap.is_stale(SampleRate::Inertial500Hz, limit + 1));
    }

    #[test]
    fn nan_counts_as_stale() {
        let mut snap = fresh_snapshot(0);
        snap.gyro_500hz[YAW] = f32::NAN;
        assert!(!snap.inertial_usable(0));

        let mut snap = fresh_snapshot(0);
        snap.pressure_alt_50hz = f32::INFINITY;
        assert!(!snap.baro_usable(0));
    }

    #[test]
    fn stamp_in_future_is_not_stale() {
        // Producer stamped just ahead of the consumer's clock read
        let snap = fresh_snapshot(10_000);
        assert!(!snap.is_stale(SampleRate::Inertial500Hz, 9_000));
    }
}
