//! The per-period orchestrator.
//!
//! Owns the PID bank, the mode machine and the active configuration
//! snapshot exclusively. Every cycle: validate inputs, run the mode
//! machine (applying its reset report to the bank), evaluate the
//! selected cascades outer-to-inner — each stage's output becomes the
//! next inner stage's *setpoint*, never its measurement — and emit the
//! clamped command vector. A cycle with stale or non-finite inputs
//! re-emits the previous vector untouched (fail-safe hold).

use libm::{cosf, sinf};

use crate::config::{ConfigStore, FlightConfig};
use crate::fault::FaultFlags;
use crate::gps::{offset_ne_m, GpsFix};
use crate::mode::{ModeInputs, ModeStateMachine, VerticalMode};
use crate::pid::{PidBank, PidRole};
use crate::scheduler::{CycleStats, CONTROL_PERIOD_US};
use crate::sensors::{wrap_180, Heading, SensorSnapshot, PITCH, ROLL, YAW};
use crate::telemetry::TelemetrySnapshot;
use crate::traits::FlashInterface;

use super::{ActuatorCommands, GuidanceTarget, PilotInput};

/// Yaw stick band treated as centered; outside it the stick commands
/// rate directly and the heading reference follows the vehicle.
pub const YAW_STICK_DEADBAND: f32 = 0.05;

/// Throttle stick position below which the arm gesture counts.
const ARM_THROTTLE_MAX: f32 = 0.05;

/// Shortest dt fed to the loops (half the nominal period).
const DT_MIN_S: f32 = 0.001;

/// Longest dt fed to the loops (ten nominal periods); a later cycle is
/// a deadline miss, not a license for a giant integration step.
const DT_MAX_S: f32 = 0.02;

const NOMINAL_DT_S: f32 = CONTROL_PERIOD_US as f32 / 1_000_000.0;

/// Everything one cycle consumes.
#[derive(Clone, Copy)]
pub struct CycleInputs<'a> {
    /// Latest sensor snapshot.
    pub snapshot: &'a SensorSnapshot,
    /// Latest GPS fix.
    pub gps: &'a GpsFix,
    /// Normalized pilot input.
    pub pilot: &'a PilotInput,
    /// External guidance references.
    pub guidance: &'a GuidanceTarget,
}

/// What one cycle produced.
#[derive(Debug, Clone, Copy)]
pub struct CycleOutcome {
    /// Command vector for the external mixer.
    pub commands: ActuatorCommands,
    /// Faults active this cycle.
    pub faults: FaultFlags,
    /// Armed state after this cycle.
    pub armed: bool,
}

/// The fixed-period control task state.
///
/// The caller reads its clock once per period and passes the timestamp
/// into [`run`](Self::run); the cycle measures its own dt from
/// successive timestamps.
pub struct ControlCycle {
    config: FlightConfig,
    bank: PidBank,
    machine: ModeStateMachine,
    stats: CycleStats,

    last_cycle_us: u64,
    last_commands: ActuatorCommands,
    last_faults: FaultFlags,
    config_faults: FaultFlags,
    history_bad: bool,

    armed: bool,
    arm_progress: u8,
    disarm_progress: u8,

    // Vertical-velocity estimate differentiated from the baro stream
    climb_rate_mps: f32,
    prev_baro_alt_m: f32,
    prev_baro_stamp_us: u64,
    // Throttle the hold modulates around, captured at engagement
    hold_base_throttle: f32,
}

impl ControlCycle {
    /// Creates the control task around an immutable config snapshot.
    pub fn new(config: FlightConfig) -> Self {
        let bank = PidBank::with_gains(&config.pid_gains);
        let history_bad = config.history_bad;
        Self {
            config,
            bank,
            machine: ModeStateMachine::new(),
            stats: CycleStats::default(),
            last_cycle_us: 0,
            last_commands: ActuatorCommands::default(),
            last_faults: FaultFlags::empty(),
            config_faults: FaultFlags::empty(),
            history_bad,
            armed: false,
            arm_progress: 0,
            disarm_progress: 0,
            climb_rate_mps: 0.0,
            prev_baro_alt_m: 0.0,
            prev_baro_stamp_us: 0,
            hold_base_throttle: 0.0,
        }
    }

    /// Creates the control task seeded from a config store, carrying
    /// the store's fault classification into every cycle outcome.
    pub fn from_store<F: FlashInterface>(store: &ConfigStore<F>) -> Self {
        let mut cycle = Self::new(store.active().clone());
        cycle.config_faults = store.fault_flags();
        cycle.history_bad = store.history_bad();
        cycle
    }

    /// Swaps in a new config snapshot (arm time or explicit reload).
    ///
    /// Gains are reloaded into the bank; accumulated channel state is
    /// kept, mode state is untouched.
    pub fn reload_from_store<F: FlashInterface>(&mut self, store: &ConfigStore<F>) {
        self.config = store.active().clone();
        self.bank.load_gains(&self.config.pid_gains);
        self.config_faults = store.fault_flags();
        self.history_bad = store.history_bad();
    }

    /// Runs one control period.
    ///
    /// `now_us` is the caller's monotonic clock read for this period.
    pub fn run(&mut self, inputs: &CycleInputs, now_us: u64) -> CycleOutcome {
        let now = now_us;
        let mut faults = self.config_faults;

        // Measured dt, bounded so one late cycle cannot integrate a
        // runaway step
        let dt = if self.last_cycle_us == 0 {
            self.stats.record(CONTROL_PERIOD_US, CONTROL_PERIOD_US);
            NOMINAL_DT_S
        } else {
            let period_us = now.saturating_sub(self.last_cycle_us).min(u32::MAX as u64) as u32;
            if self.stats.record(period_us, CONTROL_PERIOD_US) {
                faults |= FaultFlags::DEADLINE_MISS;
            }
            (period_us as f32 / 1_000_000.0).clamp(DT_MIN_S, DT_MAX_S)
        };
        self.last_cycle_us = now;

        // Fail-safe hold: a stale or non-finite upstream input must not
        // propagate into the loops; the previous command stands
        if !inputs.pilot.is_finite() || !inputs.snapshot.inertial_usable(now) {
            faults |= FaultFlags::SENSOR_STALE;
            self.last_faults = faults;
            return CycleOutcome {
                commands: self.last_commands,
                faults,
                armed: self.armed,
            };
        }

        self.update_arming(inputs.pilot);
        self.update_climb_rate(inputs.snapshot, now);

        let heading = Heading::from_snapshot(inputs.snapshot, self.config.mag_variation_deg);
        let baro_ok = inputs.snapshot.baro_usable(now);
        let gps_ok = inputs.gps.usable_for_navigation();

        let mode_inputs = ModeInputs {
            requested_flight: inputs.pilot.requested_flight,
            hold_engaged: inputs.pilot.hold_engaged && self.armed,
            vertical_reference_commanded: inputs.guidance.has_vertical_reference(),
            vertical_velocity_hold_only: self.config.vertical_velocity_hold_only,
            gps_usable: gps_ok,
            altitude_usable: baro_ok,
            throttle_stick: inputs.pilot.throttle,
            throttle_command: self.last_commands.throttle,
            pressure_alt_m: inputs.snapshot.pressure_alt_50hz,
            heading_deg: heading.true_deg,
            lat_deg: inputs.gps.lat_deg,
            lon_deg: inputs.gps.lon_deg,
        };
        let transition = self.machine.update(&mode_inputs);
        faults |= transition.faults;
        self.bank.reset_set(transition.resets);

        if transition.vertical_changed && self.machine.vertical().is_hold() {
            self.hold_base_throttle = self.last_commands.throttle;
        }

        let commands = if self.armed {
            let (roll, pitch) = self.horizontal_axes(inputs, dt);
            let yaw = self.yaw_axis(inputs, &heading, dt);
            let throttle = self.vertical_axis(inputs, dt);
            ActuatorCommands {
                roll,
                pitch,
                yaw,
                throttle,
            }
            .clamped()
        } else {
            ActuatorCommands::default()
        };

        self.last_commands = commands;
        self.last_faults = faults;
        CycleOutcome {
            commands,
            faults,
            armed: self.armed,
        }
    }

    /// Arm/disarm hysteresis: the switch state must persist for the
    /// configured number of consecutive cycles before the state flips.
    fn update_arming(&mut self, pilot: &PilotInput) {
        if !self.armed {
            self.disarm_progress = 0;
            if pilot.arm_switch && pilot.throttle <= ARM_THROTTLE_MAX {
                self.arm_progress = self.arm_progress.saturating_add(1);
                if self.arm_progress >= self.config.arm_count.max(1) {
                    self.armed = true;
                    self.arm_progress = 0;
                }
            } else {
                self.arm_progress = 0;
            }
        } else {
            self.arm_progress = 0;
            if !pilot.arm_switch {
                self.disarm_progress = self.disarm_progress.saturating_add(1);
                if self.disarm_progress >= self.config.disarm_count.max(1) {
                    self.armed = false;
                    self.disarm_progress = 0;
                    // Ground handling must not seed the next flight
                    self.bank.reset_all();
                }
            } else {
                self.disarm_progress = 0;
            }
        }
    }

    /// Differentiates the baro stream into a climb-rate estimate,
    /// advancing only when a new 50 Hz sample lands.
    fn update_climb_rate(&mut self, snapshot: &SensorSnapshot, now_us: u64) {
        if !snapshot.baro_usable(now_us) {
            return;
        }
        let stamp = snapshot.baro_stamp_us;
        if stamp == self.prev_baro_stamp_us {
            return;
        }
        if self.prev_baro_stamp_us != 0 {
            let dt = stamp.saturating_sub(self.prev_baro_stamp_us) as f32 / 1_000_000.0;
            if dt > 0.0 {
                self.climb_rate_mps = (snapshot.pressure_alt_50hz - self.prev_baro_alt_m) / dt;
            }
        }
        self.prev_baro_alt_m = snapshot.pressure_alt_50hz;
        self.prev_baro_stamp_us = stamp;
    }

    /// Roll/pitch cascade at the depth the flight mode selects.
    fn horizontal_axes(&mut self, inputs: &CycleInputs, dt: f32) -> (f32, f32) {
        let snapshot = inputs.snapshot;
        let pilot = inputs.pilot;

        let (roll_att_sp, pitch_att_sp) = match self.machine.flight().cascade_stages() {
            1 => {
                // Rate mode: sticks command angular rate directly
                let roll = self.bank.evaluate(
                    PidRole::RollRate,
                    snapshot.gyro_500hz[ROLL],
                    pilot.roll * self.config.rate_scaling,
                    dt,
                );
                let pitch = self.bank.evaluate(
                    PidRole::PitchRate,
                    snapshot.gyro_500hz[PITCH],
                    pilot.pitch * self.config.rate_scaling,
                    dt,
                );
                return (roll, pitch);
            }
            2 => (
                pilot.roll * self.config.attitude_scaling,
                pilot.pitch * self.config.attitude_scaling,
            ),
            _ => self.gps_attitude_setpoints(inputs, dt),
        };

        // Attitude loop output becomes the rate loop setpoint
        let roll_rate_sp = self.bank.evaluate(
            PidRole::RollAttitude,
            snapshot.attitude_500hz[ROLL],
            roll_att_sp,
            dt,
        );
        let pitch_rate_sp = self.bank.evaluate(
            PidRole::PitchAttitude,
            snapshot.attitude_500hz[PITCH],
            pitch_att_sp,
            dt,
        );

        let roll = self
            .bank
            .evaluate(PidRole::RollRate, snapshot.gyro_500hz[ROLL], roll_rate_sp, dt);
        let pitch = self.bank.evaluate(
            PidRole::PitchRate,
            snapshot.gyro_500hz[PITCH],
            pitch_rate_sp,
            dt,
        );
        (roll, pitch)
    }

    /// Position -> velocity stages of the GPS cascade, producing the
    /// attitude setpoints for the inner stages.
    fn gps_attitude_setpoints(&mut self, inputs: &CycleInputs, dt: f32) -> (f32, f32) {
        let gps = inputs.gps;

        let (ref_lat, ref_lon) = self.machine.position_reference();
        let (cur_n, cur_e) = offset_ne_m(ref_lat, ref_lon, gps.lat_deg, gps.lon_deg);
        let (target_n, target_e) = inputs
            .guidance
            .position_offset_ne_m
            .unwrap_or((0.0, 0.0));

        // Position loop output is the velocity loop setpoint
        let vel_n_sp = self.bank.evaluate(PidRole::PositionNorth, cur_n, target_n, dt);
        let vel_e_sp = self.bank.evaluate(PidRole::PositionEast, cur_e, target_e, dt);

        let (vel_n, vel_e) = gps.velocity_ne();
        let lean_n = self.bank.evaluate(PidRole::VelocityNorth, vel_n, vel_n_sp, dt);
        let lean_e = self.bank.evaluate(PidRole::VelocityEast, vel_e, vel_e_sp, dt);

        // Earth-frame lean commands rotate into the body frame through
        // the current yaw; forward lean maps to pitch, rightward to roll
        let yaw = inputs.snapshot.attitude_500hz[YAW];
        let forward = lean_n * cosf(yaw) + lean_e * sinf(yaw);
        let right = -lean_n * sinf(yaw) + lean_e * cosf(yaw);

        let limit = self.config.attitude_scaling;
        (right.clamp(-limit, limit), forward.clamp(-limit, limit))
    }

    /// Yaw axis: direct rate in rate mode, heading hold above it.
    fn yaw_axis(&mut self, inputs: &CycleInputs, heading: &Heading, dt: f32) -> f32 {
        let pilot = inputs.pilot;
        let gyro_yaw = inputs.snapshot.gyro_500hz[YAW];

        let yaw_rate_sp = if self.machine.flight().heading_hold()
            && pilot.yaw.abs() <= YAW_STICK_DEADBAND
        {
            // Heading loop runs on the wrapped error folded into the
            // setpoint, so the 0/360 seam stays continuous
            let error_deg = wrap_180(self.machine.heading_reference_deg() - heading.true_deg);
            self.bank.evaluate(PidRole::Heading, 0.0, error_deg, dt)
        } else {
            if self.machine.flight().heading_hold() {
                // Stick deflected: rate command, reference follows
                self.machine.set_heading_reference_deg(heading.true_deg);
            }
            pilot.yaw * self.config.rate_scaling
        };

        self.bank
            .evaluate(PidRole::YawRate, gyro_yaw, yaw_rate_sp, dt)
    }

    /// Vertical axis per the vertical mode.
    fn vertical_axis(&mut self, inputs: &CycleInputs, dt: f32) -> f32 {
        let snapshot = inputs.snapshot;
        let pilot = inputs.pilot;
        let guidance = inputs.guidance;

        match self.machine.vertical() {
            VerticalMode::ThrottleActive => pilot.throttle,
            VerticalMode::ThrottleInactive => self.machine.frozen_throttle(),
            VerticalMode::HoldFixed | VerticalMode::HoldReference => {
                let alt_sp = match (self.machine.vertical(), guidance.altitude_m) {
                    (VerticalMode::HoldReference, Some(alt)) => alt,
                    _ => self.machine.engagement_altitude_m(),
                };
                // Altitude loop output is the climb-rate setpoint
                let climb_sp =
                    self.bank
                        .evaluate(PidRole::Altitude, snapshot.pressure_alt_50hz, alt_sp, dt);
                let delta =
                    self.bank
                        .evaluate(PidRole::VelocityDown, self.climb_rate_mps, climb_sp, dt);
                (self.hold_base_throttle + delta).clamp(0.0, 1.0)
            }
            VerticalMode::VelocityHold => {
                let climb_sp = guidance.climb_rate_mps.unwrap_or_else(|| {
                    (pilot.throttle - 0.5) * 2.0 * self.config.vertical_velocity_scaling
                });
                let delta =
                    self.bank
                        .evaluate(PidRole::VelocityDown, self.climb_rate_mps, climb_sp, dt);
                (self.hold_base_throttle + delta).clamp(0.0, 1.0)
            }
        }
    }

    /// Read-only snapshot for the telemetry collaborator.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            flight_mode: self.machine.flight(),
            vertical_mode: self.machine.vertical(),
            armed: self.armed,
            integrators: self.bank.integrators(),
            faults: self.last_faults,
            history_bad: self.history_bad,
            cycle_stats: self.stats,
        }
    }

    /// Current armed state.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Command vector emitted by the last cycle.
    pub fn last_commands(&self) -> ActuatorCommands {
        self.last_commands
    }

    /// Active configuration snapshot.
    pub fn config(&self) -> &FlightConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::FixQuality;
    use crate::mode::FlightMode;
    use crate::traits::{MockTime, TimeSource};

    const PERIOD_US: u64 = CONTROL_PERIOD_US as u64;

    struct Rig {
        time: MockTime,
        cycle: ControlCycle,
        snapshot: SensorSnapshot,
        gps: GpsFix,
        pilot: PilotInput,
        guidance: GuidanceTarget,
    }

    impl Rig {
        fn new() -> Self {
            let mut config = FlightConfig::safe_defaults();
            config.arm_count = 2;
            config.disarm_count = 2;
            Self {
                time: MockTime::new(),
                cycle: ControlCycle::new(config),
                snapshot: SensorSnapshot::default(),
                gps: GpsFix::default(),
                pilot: PilotInput::default(),
                guidance: GuidanceTarget::default(),
            }
        }

        fn step(&mut self) -> CycleOutcome {
            self.time.advance(PERIOD_US);
            let now = self.time.now_us();
            self.snapshot.inertial_stamp_us = now;
            self.snapshot.accel_100hz_stamp_us = now;
            self.snapshot.mag_stamp_us = now;
            self.snapshot.baro_stamp_us = now;
            let inputs = CycleInputs {
                snapshot: &self.snapshot,
                gps: &self.gps,
                pilot: &self.pilot,
                guidance: &self.guidance,
            };
            self.cycle.run(&inputs, now)
        }

        /// Steps without refreshing the sensor stamps, advancing far
        /// enough that the 500 Hz group lapses its staleness window.
        fn step_stale(&mut self) -> CycleOutcome {
            self.time.advance(5 * PERIOD_US);
            let inputs = CycleInputs {
                snapshot: &self.snapshot,
                gps: &self.gps,
                pilot: &self.pilot,
                guidance: &self.guidance,
            };
            self.cycle.run(&inputs, self.time.now_us())
        }

        fn arm(&mut self) {
            self.pilot.arm_switch = true;
            self.pilot.throttle = 0.0;
            for _ in 0..5 {
                self.step();
            }
            assert!(self.cycle.is_armed(), "rig failed to arm");
        }
    }

    #[test]
    fn disarmed_outputs_are_neutral() {
        let mut rig = Rig::new();
        rig.pilot.roll = 1.0;
        rig.pilot.throttle = 0.8;
        let outcome = rig.step();
        assert!(!outcome.armed);
        assert_eq!(outcome.commands, ActuatorCommands::default());
    }

    #[test]
    fn arming_requires_consecutive_low_throttle_cycles() {
        let mut rig = Rig::new();
        rig.pilot.arm_switch = true;
        rig.pilot.throttle = 0.0;

        // arm_count = 2: not armed after one cycle
        assert!(!rig.step().armed);
        assert!(rig.step().armed);
    }

    #[test]
    fn arm_gesture_interrupted_by_throttle_restarts() {
        let mut rig = Rig::new();
        rig.pilot.arm_switch = true;
        rig.pilot.throttle = 0.0;
        rig.step();

        // Throttle blips above the gate: progress resets
        rig.pilot.throttle = 0.5;
        assert!(!rig.step().armed);
        rig.pilot.throttle = 0.0;
        assert!(!rig.step().armed);
        assert!(rig.step().armed);
    }

    #[test]
    fn disarm_resets_every_accumulator() {
        let mut rig = Rig::new();
        rig.arm();

        // Build up integrator state with a held stick
        rig.pilot.roll = 0.5;
        rig.pilot.throttle = 0.6;
        for _ in 0..50 {
            rig.step();
        }
        assert!(rig
            .cycle
            .telemetry()
            .integrators
            .iter()
            .any(|&i| i != 0.0));

        rig.pilot.arm_switch = false;
        rig.step();
        rig.step();
        assert!(!rig.cycle.is_armed());
        assert_eq!(
            rig.cycle.telemetry().integrators,
            [0.0; PidRole::COUNT],
            "disarm must clear ground-handling windup"
        );
    }

    #[test]
    fn stale_snapshot_holds_previous_command_exactly() {
        let mut rig = Rig::new();
        rig.arm();
        rig.pilot.throttle = 0.55;
        rig.pilot.roll = 0.2;
        let before = rig.step().commands;

        // Stamps not refreshed: inertial group goes stale
        let outcome = rig.step_stale();
        assert!(outcome.faults.contains(FaultFlags::SENSOR_STALE));
        assert_eq!(outcome.commands, before, "hold must be byte-exact");

        // Recovery: fresh stamps resume control
        let outcome = rig.step();
        assert!(!outcome.faults.contains(FaultFlags::SENSOR_STALE));
    }

    #[test]
    fn nan_pilot_input_holds_previous_command() {
        let mut rig = Rig::new();
        rig.arm();
        rig.pilot.throttle = 0.5;
        let before = rig.step().commands;

        rig.pilot.roll = f32::NAN;
        let outcome = rig.step();
        assert!(outcome.faults.contains(FaultFlags::SENSOR_STALE));
        assert_eq!(outcome.commands, before);
    }

    #[test]
    fn commands_always_normalized_and_finite() {
        let mut rig = Rig::new();
        rig.arm();
        rig.pilot.roll = 1.0;
        rig.pilot.pitch = -1.0;
        rig.pilot.yaw = 1.0;
        rig.pilot.throttle = 1.0;
        rig.snapshot.gyro_500hz = [8.0, -8.0, 8.0];
        rig.snapshot.attitude_500hz = [1.0, -1.0, 2.0];

        for _ in 0..200 {
            let commands = rig.step().commands;
            assert!(commands.is_finite());
            assert!(commands.roll.abs() <= 1.0);
            assert!(commands.pitch.abs() <= 1.0);
            assert!(commands.yaw.abs() <= 1.0);
            assert!((0.0..=1.0).contains(&commands.throttle));
        }
    }

    #[test]
    fn rate_mode_tracks_stick_direction() {
        let mut rig = Rig::new();
        rig.arm();
        // Vehicle at rest, right roll commanded: output must push right
        rig.pilot.roll = 0.5;
        let mut last = 0.0;
        for _ in 0..10 {
            last = rig.step().commands.roll;
        }
        assert!(last > 0.0, "got {last}");
    }

    #[test]
    fn deadline_miss_reported_not_fatal() {
        let mut rig = Rig::new();
        rig.arm();
        rig.step();

        // One period takes 3x nominal
        rig.time.advance(2 * PERIOD_US);
        let outcome = rig.step();
        assert!(outcome.faults.contains(FaultFlags::DEADLINE_MISS));
        assert!(outcome.commands.is_finite());

        // Next period is on time again
        let outcome = rig.step();
        assert!(!outcome.faults.contains(FaultFlags::DEADLINE_MISS));
        assert_eq!(rig.cycle.telemetry().cycle_stats.deadline_misses, 1);
    }

    #[test]
    fn fix_loss_downgrade_surfaces_in_outcome_and_telemetry() {
        let mut rig = Rig::new();
        rig.arm();
        rig.gps.quality = FixQuality::Fix3d;
        rig.pilot.requested_flight = FlightMode::Gps;
        rig.step();
        assert_eq!(rig.cycle.telemetry().flight_mode, FlightMode::Gps);

        rig.gps.quality = FixQuality::NoFix;
        let outcome = rig.step();
        assert!(outcome.faults.contains(FaultFlags::FIX_LOSS));
        let telemetry = rig.cycle.telemetry();
        assert_eq!(telemetry.flight_mode, FlightMode::Attitude);
        assert_eq!(
            telemetry.integrators[PidRole::RollAttitude.index()],
            0.0,
            "attitude accumulator must restart on downgrade"
        );
    }

    #[test]
    fn heading_hold_engages_with_centered_yaw_stick() {
        let mut rig = Rig::new();
        rig.arm();
        rig.pilot.requested_flight = FlightMode::Attitude;
        rig.snapshot.mag_10hz = [1.0, 0.0, 0.0]; // facing north
        rig.step(); // reference captured at ~0 deg

        // Rotate the field: vehicle now reads east of its reference;
        // the yaw command must steer back (negative direction)
        rig.snapshot.mag_10hz = [0.0, -1.0, 0.0]; // facing east
        let mut yaw_cmd = 0.0;
        for _ in 0..10 {
            yaw_cmd = rig.step().commands.yaw;
        }
        assert!(yaw_cmd < 0.0, "got {yaw_cmd}");
    }

    #[test]
    fn yaw_stick_overrides_heading_hold_and_slews_reference() {
        let mut rig = Rig::new();
        rig.arm();
        rig.pilot.requested_flight = FlightMode::Attitude;
        rig.snapshot.mag_10hz = [1.0, 0.0, 0.0];
        rig.step();

        // Deflect the stick: rate command in stick direction
        rig.pilot.yaw = 0.5;
        let mut cmd = 0.0;
        for _ in 0..10 {
            cmd = rig.step().commands.yaw;
        }
        assert!(cmd > 0.0, "got {cmd}");
    }

    #[test]
    fn altitude_hold_raises_throttle_below_target() {
        let mut rig = Rig::new();
        rig.arm();
        rig.pilot.throttle = 0.5;
        rig.snapshot.pressure_alt_50hz = 20.0;
        rig.step();

        rig.pilot.hold_engaged = true;
        rig.step();
        assert_eq!(rig.cycle.telemetry().vertical_mode, VerticalMode::HoldFixed);

        // Vehicle sinks 2 m below the engagement altitude
        rig.snapshot.pressure_alt_50hz = 18.0;
        let mut throttle = 0.0;
        for _ in 0..100 {
            throttle = rig.step().commands.throttle;
        }
        assert!(
            throttle > 0.5,
            "hold must add throttle below target, got {throttle}"
        );
    }

    #[test]
    fn hold_release_freezes_throttle_until_stick_matches() {
        let mut rig = Rig::new();
        rig.arm();
        rig.pilot.throttle = 0.5;
        rig.snapshot.pressure_alt_50hz = 20.0;
        rig.step();
        rig.pilot.hold_engaged = true;
        for _ in 0..20 {
            rig.step();
        }
        let held = rig.cycle.last_commands().throttle;

        // Release with the stick parked low: output must not jump there
        rig.pilot.hold_engaged = false;
        rig.pilot.throttle = 0.1;
        let outcome = rig.step();
        assert_eq!(
            rig.cycle.telemetry().vertical_mode,
            VerticalMode::ThrottleInactive
        );
        assert!((outcome.commands.throttle - held).abs() < 0.05);

        // Stick brought up to the frozen value: throttle goes live
        rig.pilot.throttle = held;
        rig.step();
        rig.step();
        assert_eq!(
            rig.cycle.telemetry().vertical_mode,
            VerticalMode::ThrottleActive
        );
    }

    #[test]
    fn gps_mode_leans_toward_commanded_offset() {
        let mut rig = Rig::new();
        rig.arm();
        rig.gps.quality = FixQuality::Fix3d;
        rig.gps.lat_deg = 35.0;
        rig.gps.lon_deg = 139.0;
        rig.pilot.requested_flight = FlightMode::Gps;
        rig.step();

        // Command a 10 m offset to the north; vehicle faces north, so
        // the cascade must pitch toward it
        rig.guidance.position_offset_ne_m = Some((10.0, 0.0));
        let mut pitch = 0.0;
        for _ in 0..50 {
            pitch = rig.step().commands.pitch;
        }
        assert!(pitch > 0.0, "got {pitch}");
    }

    #[test]
    fn config_faults_carried_into_every_outcome() {
        let time = MockTime::new();
        let mut store = ConfigStore::new(crate::traits::MockFlash::new());
        let _ = store.load(); // empty storage -> defaults + history bad

        let mut cycle = ControlCycle::from_store(&store);
        let snapshot = SensorSnapshot::default();
        let gps = GpsFix::default();
        let pilot = PilotInput::default();
        let guidance = GuidanceTarget::default();

        time.advance(PERIOD_US);
        let outcome = cycle.run(
            &CycleInputs {
                snapshot: &snapshot,
                gps: &gps,
                pilot: &pilot,
                guidance: &guidance,
            },
            time.now_us(),
        );
        // Empty storage is bad-history, not a config fault
        assert!(!outcome.faults.contains(FaultFlags::CONFIG_INTEGRITY));
        assert!(cycle.telemetry().history_bad);
    }
}
