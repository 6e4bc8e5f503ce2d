//! Twelve-channel PID bank for the cascaded control loops.
//!
//! Channels are addressed by [`PidRole`], never by raw index, and the
//! evaluation order per axis is the explicit [`PidRole::ALL`] list:
//! rate, then attitude, then the GPS cascade (velocity, position) and
//! the vertical pair. Channel state is owned exclusively by the control
//! cycle; telemetry gets copies.

use bitflags::bitflags;

/// The fixed set of controller roles, in per-axis evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidRole {
    /// Roll angular-rate loop.
    RollRate,
    /// Pitch angular-rate loop.
    PitchRate,
    /// Yaw angular-rate loop.
    YawRate,
    /// Roll attitude loop.
    RollAttitude,
    /// Pitch attitude loop.
    PitchAttitude,
    /// Heading-hold loop (feeds the yaw-rate loop).
    Heading,
    /// North horizontal-velocity loop.
    VelocityNorth,
    /// East horizontal-velocity loop.
    VelocityEast,
    /// Vertical-velocity (climb rate) loop.
    VelocityDown,
    /// North position loop.
    PositionNorth,
    /// East position loop.
    PositionEast,
    /// Altitude-hold loop (feeds the vertical-velocity loop).
    Altitude,
}

impl PidRole {
    /// Number of channels in the bank.
    pub const COUNT: usize = 12;

    /// Every role, in the fixed evaluation order.
    pub const ALL: [PidRole; Self::COUNT] = [
        PidRole::RollRate,
        PidRole::PitchRate,
        PidRole::YawRate,
        PidRole::RollAttitude,
        PidRole::PitchAttitude,
        PidRole::Heading,
        PidRole::VelocityNorth,
        PidRole::VelocityEast,
        PidRole::VelocityDown,
        PidRole::PositionNorth,
        PidRole::PositionEast,
        PidRole::Altitude,
    ];

    /// Stable channel index of this role.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Role name for telemetry and logs.
    pub fn name(self) -> &'static str {
        match self {
            PidRole::RollRate => "roll_rate",
            PidRole::PitchRate => "pitch_rate",
            PidRole::YawRate => "yaw_rate",
            PidRole::RollAttitude => "roll_att",
            PidRole::PitchAttitude => "pitch_att",
            PidRole::Heading => "heading",
            PidRole::VelocityNorth => "vel_north",
            PidRole::VelocityEast => "vel_east",
            PidRole::VelocityDown => "vel_down",
            PidRole::PositionNorth => "pos_north",
            PidRole::PositionEast => "pos_east",
            PidRole::Altitude => "altitude",
        }
    }

    /// This role as a one-bit [`RoleSet`].
    pub const fn as_set(self) -> RoleSet {
        RoleSet::from_bits_truncate(1 << self.index())
    }
}

bitflags! {
    /// A set of controller roles, used for activation masks and reset
    /// reports from mode transitions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RoleSet: u16 {
        const ROLL_RATE = 1 << 0;
        const PITCH_RATE = 1 << 1;
        const YAW_RATE = 1 << 2;
        const ROLL_ATTITUDE = 1 << 3;
        const PITCH_ATTITUDE = 1 << 4;
        const HEADING = 1 << 5;
        const VELOCITY_NORTH = 1 << 6;
        const VELOCITY_EAST = 1 << 7;
        const VELOCITY_DOWN = 1 << 8;
        const POSITION_NORTH = 1 << 9;
        const POSITION_EAST = 1 << 10;
        const ALTITUDE = 1 << 11;
    }
}

impl RoleSet {
    /// The three angular-rate loops, active in every flight mode.
    pub const RATE_LOOPS: RoleSet = RoleSet::ROLL_RATE
        .union(RoleSet::PITCH_RATE)
        .union(RoleSet::YAW_RATE);

    /// The attitude-level loops added by attitude mode.
    pub const ATTITUDE_LOOPS: RoleSet = RoleSet::ROLL_ATTITUDE
        .union(RoleSet::PITCH_ATTITUDE)
        .union(RoleSet::HEADING);

    /// The horizontal velocity and position loops added by GPS mode.
    pub const GPS_CASCADE: RoleSet = RoleSet::VELOCITY_NORTH
        .union(RoleSet::VELOCITY_EAST)
        .union(RoleSet::POSITION_NORTH)
        .union(RoleSet::POSITION_EAST);

    /// The vertical pair used by the altitude-hold states.
    pub const VERTICAL_HOLD: RoleSet = RoleSet::ALTITUDE.union(RoleSet::VELOCITY_DOWN);

    /// Roles contained in this set, in evaluation order.
    pub fn roles(self) -> impl Iterator<Item = PidRole> {
        PidRole::ALL.into_iter().filter(move |r| self.contains(r.as_set()))
    }
}

/// Tunable coefficients and clamps for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain (per second).
    pub ki: f32,
    /// Derivative gain (seconds).
    pub kd: f32,
    /// Symmetric clamp on the integral accumulator.
    pub integrator_limit: f32,
    /// Symmetric clamp on the channel output.
    pub output_limit: f32,
    /// Derivative from the measurement instead of the error, avoiding a
    /// kick on setpoint steps.
    pub derivative_on_measurement: bool,
}

impl PidGains {
    /// All-zero gains with unit clamps; the channel outputs nothing.
    pub const fn disabled() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integrator_limit: 1.0,
            output_limit: 1.0,
            derivative_on_measurement: false,
        }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::disabled()
    }
}

/// One controller with its accumulated state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidChannel {
    gains: PidGains,
    integrator: f32,
    prev_error: f32,
    prev_measurement: f32,
    /// Set after the first evaluation since reset; the derivative term
    /// is suppressed until a previous sample exists.
    primed: bool,
}

impl PidChannel {
    /// Creates a channel with the given gains and zeroed state.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            ..Default::default()
        }
    }

    /// Runs one PID step: error P/I/D with tandem anti-windup and
    /// output clamping.
    ///
    /// `dt` is the measured inter-cycle interval in seconds. Non-finite
    /// inputs or a non-positive `dt` leave the channel state untouched
    /// and return the clamped accumulator alone; the control cycle
    /// screens such inputs out as stale before evaluation, this is the
    /// backstop.
    pub fn evaluate(&mut self, measurement: f32, setpoint: f32, dt: f32) -> f32 {
        let limit = self.gains.output_limit;
        if !measurement.is_finite() || !setpoint.is_finite() || !dt.is_finite() || dt <= 0.0 {
            return self.integrator.clamp(-limit, limit);
        }

        let error = setpoint - measurement;

        self.integrator = (self.integrator + self.gains.ki * error * dt)
            .clamp(-self.gains.integrator_limit, self.gains.integrator_limit);

        let derivative = if !self.primed {
            0.0
        } else if self.gains.derivative_on_measurement {
            -self.gains.kd * (measurement - self.prev_measurement) / dt
        } else {
            self.gains.kd * (error - self.prev_error) / dt
        };

        self.prev_error = error;
        self.prev_measurement = measurement;
        self.primed = true;

        (self.gains.kp * error + self.integrator + derivative).clamp(-limit, limit)
    }

    /// Zeroes the accumulator and previous samples.
    ///
    /// Required whenever the channel transitions inactive -> active and
    /// on disarm; a reset channel behaves exactly like a fresh one.
    pub fn reset(&mut self) {
        self.integrator = 0.0;
        self.prev_error = 0.0;
        self.prev_measurement = 0.0;
        self.primed = false;
    }

    /// Current integral accumulator (telemetry copy).
    pub fn integrator(&self) -> f32 {
        self.integrator
    }

    /// Current gains.
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Replaces the gains, keeping accumulated state.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }
}

/// The twelve channels, addressed by role.
#[derive(Debug, Clone)]
pub struct PidBank {
    channels: [PidChannel; PidRole::COUNT],
}

impl PidBank {
    /// Creates a bank with all channels disabled.
    pub fn new() -> Self {
        Self {
            channels: [PidChannel::default(); PidRole::COUNT],
        }
    }

    /// Creates a bank seeded from a per-role gain table.
    pub fn with_gains(gains: &[PidGains; PidRole::COUNT]) -> Self {
        let mut bank = Self::new();
        bank.load_gains(gains);
        bank
    }

    /// Reloads every channel's gains, keeping accumulated state.
    pub fn load_gains(&mut self, gains: &[PidGains; PidRole::COUNT]) {
        for role in PidRole::ALL {
            self.channels[role.index()].set_gains(gains[role.index()]);
        }
    }

    /// Evaluates one role. See [`PidChannel::evaluate`].
    pub fn evaluate(&mut self, role: PidRole, measurement: f32, setpoint: f32, dt: f32) -> f32 {
        self.channels[role.index()].evaluate(measurement, setpoint, dt)
    }

    /// Resets one role. See [`PidChannel::reset`].
    pub fn reset(&mut self, role: PidRole) {
        self.channels[role.index()].reset();
    }

    /// Resets every role named in `set`.
    pub fn reset_set(&mut self, set: RoleSet) {
        for role in set.roles() {
            self.reset(role);
        }
    }

    /// Resets the whole bank (disarm).
    pub fn reset_all(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.reset();
        }
    }

    /// Read access to one channel.
    pub fn channel(&self, role: PidRole) -> &PidChannel {
        &self.channels[role.index()]
    }

    /// Integral accumulators of all channels, in role order.
    pub fn integrators(&self) -> [f32; PidRole::COUNT] {
        let mut out = [0.0; PidRole::COUNT];
        for role in PidRole::ALL {
            out[role.index()] = self.channels[role.index()].integrator();
        }
        out
    }
}

impl Default for PidBank {
    fn default() -> Self {
        Self::new()
    }
}
