//! Per-axis actuator command vector.

/// Normalized commands handed to the external mixer each cycle.
///
/// Axes are [-1, 1], throttle is [0, 1]. The mixer maps these onto its
/// configured topology; nothing here knows about motors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActuatorCommands {
    /// Roll axis command.
    pub roll: f32,
    /// Pitch axis command.
    pub pitch: f32,
    /// Yaw axis command.
    pub yaw: f32,
    /// Collective throttle command.
    pub throttle: f32,
}

impl ActuatorCommands {
    /// Returns the vector clamped into the normalized command range.
    pub fn clamped(self) -> Self {
        Self {
            roll: self.roll.clamp(-1.0, 1.0),
            pitch: self.pitch.clamp(-1.0, 1.0),
            yaw: self.yaw.clamp(-1.0, 1.0),
            throttle: self.throttle.clamp(0.0, 1.0),
        }
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.roll.is_finite()
            && self.pitch.is_finite()
            && self.yaw.is_finite()
            && self.throttle.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds_each_axis() {
        let commands = ActuatorCommands {
            roll: 3.0,
            pitch: -3.0,
            yaw: 0.25,
            throttle: 1.5,
        }
        .clamped();
        assert_eq!(commands.roll, 1.0);
        assert_eq!(commands.pitch, -1.0);
        assert_eq!(commands.yaw, 0.25);
        assert_eq!(commands.throttle, 1.0);

        let commands = ActuatorCommands {
            throttle: -0.5,
            ..Default::default()
        }
        .clamped();
        assert_eq!(commands.throttle, 0.0);
    }

    #[test]
    fn default_is_neutral() {
        let commands = ActuatorCommands::default();
        assert_eq!(commands, commands.clamped());
        assert_eq!(commands.throttle, 0.0);
        assert!(commands.is_finite());
    }
}
