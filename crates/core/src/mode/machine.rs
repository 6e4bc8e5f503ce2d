//! Compound mode state machine with reset reporting.
//!
//! Transitions are driven by the pilot/guidance mode-select input plus
//! automatic safety downgrades (fix loss, altitude source loss). The
//! machine never touches PID state itself: each `update` returns a
//! [`Transition`] naming the roles the control cycle must reset, so
//! channel state stays under a single owner.

use crate::fault::FaultFlags;
use crate::pid::RoleSet;

use super::{FlightMode, VerticalMode};

/// Stick band around the frozen throttle within which the inactive
/// throttle state re-arms (fraction of full stick travel).
pub const THROTTLE_REENGAGE_BAND: f32 = 0.10;

/// Inputs the machine evaluates once per control cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeInputs {
    /// Flight mode requested by the pilot/guidance mode-select signal.
    pub requested_flight: FlightMode,
    /// Vertical hold switch state.
    pub hold_engaged: bool,
    /// Guidance supplies an explicit vertical reference.
    pub vertical_reference_commanded: bool,
    /// Configuration: holds always engage as velocity hold.
    pub vertical_velocity_hold_only: bool,
    /// GPS fix quality allows the GPS cascade.
    pub gps_usable: bool,
    /// Pressure-altitude source is fresh and finite.
    pub altitude_usable: bool,
    /// Current throttle stick position, [0, 1].
    pub throttle_stick: f32,
    /// Current throttle command, [0, 1] (frozen on hold disengage).
    pub throttle_command: f32,
    /// Current pressure altitude in meters (engagement capture).
    pub pressure_alt_m: f32,
    /// Current true heading in degrees (heading-hold capture).
    pub heading_deg: f32,
    /// Current latitude in degrees (position-hold capture).
    pub lat_deg: f32,
    /// Current longitude in degrees (position-hold capture).
    pub lon_deg: f32,
}

/// What one `update` changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transition {
    /// Roles the control cycle must reset before evaluating them.
    pub resets: RoleSet,
    /// Faults raised by automatic downgrades.
    pub faults: FaultFlags,
    /// The flight mode changed this cycle.
    pub flight_changed: bool,
    /// The vertical mode changed this cycle.
    pub vertical_changed: bool,
}

/// The compound FlightMode x VerticalMode state machine.
#[derive(Debug, Clone)]
pub struct ModeStateMachine {
    flight: FlightMode,
    vertical: VerticalMode,
    engagement_alt_m: f32,
    frozen_throttle: f32,
    heading_ref_deg: f32,
    position_ref: (f32, f32),
}

impl ModeStateMachine {
    /// Starts in rate mode with the vertical hold disengaged.
    pub fn new() -> Self {
        Self {
            flight: FlightMode::Rate,
            vertical: VerticalMode::ThrottleActive,
            engagement_alt_m: 0.0,
            frozen_throttle: 0.0,
            heading_ref_deg: 0.0,
            position_ref: (0.0, 0.0),
        }
    }

    /// Current flight mode.
    pub fn flight(&self) -> FlightMode {
        self.flight
    }

    /// Current vertical mode.
    pub fn vertical(&self) -> VerticalMode {
        self.vertical
    }

    /// Altitude captured at the last hold engagement or release.
    pub fn engagement_altitude_m(&self) -> f32 {
        self.engagement_alt_m
    }

    /// Throttle command frozen when the hold disengaged.
    pub fn frozen_throttle(&self) -> f32 {
        self.frozen_throttle
    }

    /// Heading reference for the heading-hold loop.
    pub fn heading_reference_deg(&self) -> f32 {
        self.heading_ref_deg
    }

    /// Re-captures the heading reference (yaw stick deflected).
    pub fn set_heading_reference_deg(&mut self, deg: f32) {
        self.heading_ref_deg = deg;
    }

    /// Position reference (lat, lon) captured at GPS-mode entry.
    pub fn position_reference(&self) -> (f32, f32) {
        self.position_ref
    }

    /// Runs the transition logic for one cycle.
    pub fn update(&mut self, inputs: &ModeInputs) -> Transition {
        let mut transition = Transition::default();

        self.update_flight(inputs, &mut transition);
        self.update_vertical(inputs, &mut transition);

        transition
    }

    fn update_flight(&mut self, inputs: &ModeInputs, transition: &mut Transition) {
        let mut target = inputs.requested_flight;

        // Automatic downgrade: the GPS cascade never runs without a
        // usable fix, whether requested or already active.
        if target == FlightMode::Gps && !inputs.gps_usable {
            target = FlightMode::Attitude;
            if self.flight == FlightMode::Gps {
                transition.faults |= FaultFlags::FIX_LOSS;
            }
        }

        if target == self.flight {
            return;
        }

        // A flight transition changes the setpoint source of every
        // stage above the rate loops, so all of them restart clean.
        // The rate loops keep their semantics and their accumulators.
        let affected = self.flight.active_roles() | target.active_roles();
        transition.resets |= affected & !RoleSet::RATE_LOOPS;

        if !self.flight.heading_hold() && target.heading_hold() {
            self.heading_ref_deg = inputs.heading_deg;
        }
        if target == FlightMode::Gps {
            self.position_ref = (inputs.lat_deg, inputs.lon_deg);
        }

        self.flight = target;
        transition.flight_changed = true;
    }

    fn update_vertical(&mut self, inputs: &ModeInputs, transition: &mut Transition) {
        let target = if !inputs.altitude_usable {
            // Loss of the altitude source forces throttle-direct; the
            // pilot gets the stick back immediately.
            if self.vertical.is_hold() {
                transition.faults |= FaultFlags::SENSOR_STALE;
            }
            VerticalMode::ThrottleActive
        } else if inputs.hold_engaged {
            if inputs.vertical_velocity_hold_only {
                VerticalMode::VelocityHold
            } else if inputs.vertical_reference_commanded {
                VerticalMode::HoldReference
            } else {
                VerticalMode::HoldFixed
            }
        } else {
            match self.vertical {
                v if v.is_hold() => {
                    self.frozen_throttle = inputs.throttle_command;
                    VerticalMode::ThrottleInactive
                }
                VerticalMode::ThrottleInactive => {
                    if (inputs.throttle_stick - self.frozen_throttle).abs()
                        <= THROTTLE_REENGAGE_BAND
                    {
                        VerticalMode::ThrottleActive
                    } else {
                        VerticalMode::ThrottleInactive
                    }
                }
                _ => VerticalMode::ThrottleActive,
            }
        };

        if target == self.vertical {
            return;
        }

        let affected = self.vertical.active_roles() | target.active_roles();
        transition.resets |= affected;

        // Both edges of a hold capture the current measurement: entry
        // sets the hold target, exit seeds the reference for re-entry.
        self.engagement_alt_m = inputs.pressure_alt_m;

        self.vertical = target;
        transition.vertical_changed = true;
    }
}

impl Default for ModeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
