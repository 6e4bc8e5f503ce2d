//! Flight mode: how deep the horizontal cascade runs.

use crate::pid::RoleSet;

/// Horizontal control capability, monotonically more capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum FlightMode {
    /// Rate loops only; sticks command angular rate.
    #[default]
    Rate,
    /// Attitude over rate; sticks command lean angle.
    Attitude,
    /// Full cascade: position over velocity over attitude over rate.
    Gps,
}

impl FlightMode {
    /// Cascade stages executed per horizontal axis.
    pub const fn cascade_stages(self) -> u8 {
        match self {
            FlightMode::Rate => 1,
            FlightMode::Attitude => 2,
            FlightMode::Gps => 3,
        }
    }

    /// PID roles that run in this mode.
    pub const fn active_roles(self) -> RoleSet {
        match self {
            FlightMode::Rate => RoleSet::RATE_LOOPS,
            FlightMode::Attitude => RoleSet::RATE_LOOPS.union(RoleSet::ATTITUDE_LOOPS),
            FlightMode::Gps => RoleSet::RATE_LOOPS
                .union(RoleSet::ATTITUDE_LOOPS)
                .union(RoleSet::GPS_CASCADE),
        }
    }

    /// True when the yaw axis runs heading hold instead of direct rate.
    pub const fn heading_hold(self) -> bool {
        !matches!(self, FlightMode::Rate)
    }

    /// Mode name for telemetry and logs.
    pub fn name(self) -> &'static str {
        match self {
            FlightMode::Rate => "rate",
            FlightMode::Attitude => "attitude",
            FlightMode::Gps => "gps",
        }
    }
}
