//! Vertical mode: which altitude roles run and what feeds them.

use crate::pid::RoleSet;

/// Vertical-axis control state, independent of the flight mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalMode {
    /// Hold disengaged, throttle stick drives the output directly.
    #[default]
    ThrottleActive,
    /// Altitude hold at the altitude captured when the hold engaged.
    HoldFixed,
    /// Altitude hold at an externally commanded reference altitude.
    HoldReference,
    /// Vertical-velocity hold at a commanded climb rate.
    VelocityHold,
    /// Hold disengaged but the stick has not yet matched the frozen
    /// throttle; output stays frozen to avoid a step.
    ThrottleInactive,
}

impl VerticalMode {
    /// PID roles that run in this state.
    pub const fn active_roles(self) -> RoleSet {
        match self {
            VerticalMode::ThrottleActive | VerticalMode::ThrottleInactive => RoleSet::empty(),
            VerticalMode::HoldFixed | VerticalMode::HoldReference => RoleSet::VERTICAL_HOLD,
            VerticalMode::VelocityHold => RoleSet::VELOCITY_DOWN,
        }
    }

    /// True for the three hold states.
    pub const fn is_hold(self) -> bool {
        matches!(
            self,
            VerticalMode::HoldFixed | VerticalMode::HoldReference | VerticalMode::VelocityHold
        )
    }

    /// State name for telemetry and logs.
    pub fn name(self) -> &'static str {
        match self {
            VerticalMode::ThrottleActive => "throttle_active",
            VerticalMode::HoldFixed => "hold_fixed",
            VerticalMode::HoldReference => "hold_reference",
            VerticalMode::VelocityHold => "velocity_hold",
            VerticalMode::ThrottleInactive => "throttle_inactive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::PidRole;

    #[test]
    fn throttle_states_run_no_vertical_loops() {
        assert_eq!(VerticalMode::ThrottleActive.active_roles(), RoleSet::empty());
        assert_eq!(
            VerticalMode::ThrottleInactive.active_roles(),
            RoleSet::empty()
        );
    }

    #[test]
    fn hold_states_run_the_vertical_pair() {
        for mode in [VerticalMode::HoldFixed, VerticalMode::HoldReference] {
            let roles = mode.active_roles();
            assert!(roles.contains(PidRole::Altitude.as_set()));
            assert!(roles.contains(PidRole::VelocityDown.as_set()));
        }
        // Velocity hold runs the inner loop only
        let roles = VerticalMode::VelocityHold.active_roles();
        assert!(!roles.contains(PidRole::Altitude.as_set()));
        assert!(roles.contains(PidRole::VelocityDown.as_set()));
    }

    #[test]
    fn hold_classification() {
        assert!(VerticalMode::HoldFixed.is_hold());
        assert!(VerticalMode::HoldReference.is_hold());
        assert!(VerticalMode::VelocityHold.is_hold());
        assert!(!VerticalMode::ThrottleActive.is_hold());
        assert!(!VerticalMode::ThrottleInactive.is_hold());
    }
}
