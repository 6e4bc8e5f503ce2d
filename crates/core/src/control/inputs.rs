//! Normalized pilot and guidance inputs.
//!
//! The receiver/guidance collaborator decodes hardware channels into
//! these values before the control core ever sees them.

use crate::mode::FlightMode;

/// Normalized stick and switch state for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct PilotInput {
    /// Roll stick, [-1, 1].
    pub roll: f32,
    /// Pitch stick, [-1, 1].
    pub pitch: f32,
    /// Yaw stick, [-1, 1].
    pub yaw: f32,
    /// Throttle stick, [0, 1].
    pub throttle: f32,
    /// Flight mode selected on the mode switch.
    pub requested_flight: FlightMode,
    /// Vertical hold switch.
    pub hold_engaged: bool,
    /// Arm switch.
    pub arm_switch: bool,
}

impl PilotInput {
    /// True when every stick value is finite.
    pub fn is_finite(&self) -> bool {
        self.roll.is_finite()
            && self.pitch.is_finite()
            && self.yaw.is_finite()
            && self.throttle.is_finite()
    }
}

impl Default for PilotInput {
    fn default() -> Self {
        Self {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            throttle: 0.0,
            requested_flight: FlightMode::Rate,
            hold_engaged: false,
            arm_switch: false,
        }
    }
}

/// Optional externally commanded references.
///
/// `None` everywhere means "hold what was captured at engagement".
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidanceTarget {
    /// Commanded position offset (north, east) in meters from the
    /// position captured at GPS-mode entry.
    pub position_offset_ne_m: Option<(f32, f32)>,
    /// Commanded reference altitude in meters.
    pub altitude_m: Option<f32>,
    /// Commanded climb rate in m/s.
    pub climb_rate_mps: Option<f32>,
}

impl GuidanceTarget {
    /// Guidance is supplying a vertical reference this cycle.
    pub fn has_vertical_reference(&self) -> bool {
        self.altitude_m.is_some() || self.climb_rate_mps.is_some()
    }
}
