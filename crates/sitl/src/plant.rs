//! Lightweight quadrotor plant.
//!
//! Built-in physics with no external simulator dependency, suitable for
//! CI and rapid iteration: first-order rate dynamics per body axis,
//! tilt-driven horizontal acceleration, thrust-driven vertical motion,
//! and per-rate sensor synthesis with configurable Gaussian noise and a
//! deterministic seeded mode.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quad_pilot_core::control::ActuatorCommands;
use quad_pilot_core::gps::{FixQuality, GpsFix};
use quad_pilot_core::sensors::{SensorSnapshot, PITCH, ROLL, YAW};

const GRAVITY_MSS: f32 = 9.81;
const M_PER_DEG_LAT: f32 = 111_320.0;

/// Configuration for the quadrotor plant.
#[derive(Debug, Clone)]
pub struct PlantConfig {
    /// Simulation step in microseconds (500 Hz default).
    pub step_size_us: u64,
    /// Angular acceleration per unit axis command, rad/s^2.
    pub torque_gain: f32,
    /// Body-rate damping, 1/s.
    pub rate_damping: f32,
    /// Vertical acceleration per unit throttle above hover, m/s^2.
    pub thrust_gain: f32,
    /// Throttle that exactly balances gravity.
    pub hover_throttle: f32,
    /// Vertical drag, 1/s.
    pub vertical_drag: f32,
    /// Horizontal drag, 1/s.
    pub horizontal_drag: f32,
    /// Gyro noise standard deviation, rad/s.
    pub gyro_noise_rads: f32,
    /// Accel noise standard deviation, m/s^2.
    pub accel_noise_mss: f32,
    /// Baro altitude noise standard deviation, m.
    pub baro_noise_m: f32,
    /// GPS position noise standard deviation, m.
    pub gps_noise_m: f32,
    /// RNG seed for deterministic mode. None = random.
    pub seed: Option<u64>,
    /// Reference latitude for GPS synthesis, degrees.
    pub origin_lat_deg: f32,
    /// Reference longitude for GPS synthesis, degrees.
    pub origin_lon_deg: f32,
    /// Fix quality reported by the synthesized receiver.
    pub fix_quality: FixQuality,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            step_size_us: 2_000, // 500 Hz
            torque_gain: 40.0,
            rate_damping: 5.0,
            thrust_gain: 20.0,
            hover_throttle: 0.5,
            vertical_drag: 1.0,
            horizontal_drag: 0.5,
            gyro_noise_rads: 0.002,
            accel_noise_mss: 0.05,
            baro_noise_m: 0.05,
            gps_noise_m: 0.3,
            seed: None,
            origin_lat_deg: 35.6762,
            origin_lon_deg: 139.6503,
            fix_quality: FixQuality::Fix3d,
        }
    }
}

impl PlantConfig {
    /// Deterministic noiseless configuration for tests.
    pub fn noiseless(seed: u64) -> Self {
        Self {
            gyro_noise_rads: 0.0,
            accel_noise_mss: 0.0,
            baro_noise_m: 0.0,
            gps_noise_m: 0.0,
            seed: Some(seed),
            ..Default::default()
        }
    }
}

/// Rigid-body state integrated by the plant.
#[derive(Debug, Clone, Copy, Default)]
struct BodyState {
    /// Attitude (roll, pitch, yaw) in radians.
    attitude: [f32; 3],
    /// Body rates in rad/s.
    rates: [f32; 3],
    /// Altitude above the origin in meters.
    alt_m: f32,
    /// Climb rate in m/s.
    climb_mps: f32,
    /// North/east position in meters.
    pos_ne_m: (f32, f32),
    /// North/east velocity in m/s.
    vel_ne_mps: (f32, f32),
}

/// The quadrotor plant with per-rate sensor synthesis.
pub struct QuadPlant {
    config: PlantConfig,
    state: BodyState,
    commands: ActuatorCommands,
    rng: StdRng,
    sim_time_us: u64,
    step_count: u64,
    snapshot: SensorSnapshot,
    gps: GpsFix,
}

impl QuadPlant {
    /// Creates a plant from the given configuration.
    pub fn new(config: PlantConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut plant = Self {
            config,
            state: BodyState::default(),
            commands: ActuatorCommands::default(),
            rng,
            sim_time_us: 0,
            step_count: 0,
            snapshot: SensorSnapshot::default(),
            gps: GpsFix::default(),
        };
        // Seed every sensor group so the first cycle sees fresh data
        plant.synthesize_inertial();
        plant.synthesize_filtered_accel();
        plant.synthesize_baro();
        plant.synthesize_mag();
        plant.synthesize_gps();
        plant
    }

    /// Creates a plant with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PlantConfig::default())
    }

    /// Latest actuator commands take effect on the next step.
    pub fn apply_commands(&mut self, commands: ActuatorCommands) {
        self.commands = commands.clamped();
    }

    /// Advances the plant one step and refreshes due sensor groups.
    pub fn step(&mut self) {
        let dt = self.config.step_size_us as f32 / 1_000_000.0;
        self.integrate(dt);
        self.sim_time_us += self.config.step_size_us;
        self.step_count += 1;

        // 500 Hz inertial every step; slower groups decimated by count
        self.synthesize_inertial();
        if self.step_count % 5 == 0 {
            self.synthesize_filtered_accel();
        }
        if self.step_count % 10 == 0 {
            self.synthesize_baro();
        }
        if self.step_count % 50 == 0 {
            self.synthesize_mag();
        }
        if self.step_count % 100 == 0 {
            self.synthesize_gps();
        }
    }

    fn integrate(&mut self, dt: f32) {
        let c = &self.config;
        let axis_cmd = [self.commands.roll, self.commands.pitch, self.commands.yaw];

        for axis in 0..3 {
            let rate_dot =
                c.torque_gain * axis_cmd[axis] - c.rate_damping * self.state.rates[axis];
            self.state.rates[axis] += rate_dot * dt;
            self.state.attitude[axis] += self.state.rates[axis] * dt;
        }
        // Keep lean angles bounded like a real airframe would be
        self.state.attitude[ROLL] = self.state.attitude[ROLL].clamp(-1.2, 1.2);
        self.state.attitude[PITCH] = self.state.attitude[PITCH].clamp(-1.2, 1.2);

        // Vertical: thrust above hover accelerates, drag opposes
        let accel_up = c.thrust_gain * (self.commands.throttle - c.hover_throttle)
            - c.vertical_drag * self.state.climb_mps;
        self.state.climb_mps += accel_up * dt;
        self.state.alt_m += self.state.climb_mps * dt;
        if self.state.alt_m < 0.0 {
            // Ground contact
            self.state.alt_m = 0.0;
            self.state.climb_mps = self.state.climb_mps.max(0.0);
        }

        // Horizontal: lean tips the thrust vector; forward = +pitch,
        // right = +roll, rotated into the earth frame through yaw
        let forward = GRAVITY_MSS * self.state.attitude[PITCH];
        let right = GRAVITY_MSS * self.state.attitude[ROLL];
        let yaw = self.state.attitude[YAW];
        let accel_n = forward * yaw.cos() - right * yaw.sin()
            - c.horizontal_drag * self.state.vel_ne_mps.0;
        let accel_e = forward * yaw.sin() + right * yaw.cos()
            - c.horizontal_drag * self.state.vel_ne_mps.1;
        self.state.vel_ne_mps.0 += accel_n * dt;
        self.state.vel_ne_mps.1 += accel_e * dt;
        self.state.pos_ne_m.0 += self.state.vel_ne_mps.0 * dt;
        self.state.pos_ne_m.1 += self.state.vel_ne_mps.1 * dt;
    }

    fn synthesize_inertial(&mut self) {
        for axis in 0..3 {
            self.snapshot.attitude_500hz[axis] = self.state.attitude[axis];
            self.snapshot.gyro_500hz[axis] =
                self.state.rates[axis] + self.gaussian(self.config.gyro_noise_rads);
            self.snapshot.accel_500hz[axis] = self.gaussian(self.config.accel_noise_mss);
        }
        self.snapshot.accel_500hz[2] -= GRAVITY_MSS;
        self.snapshot.inertial_stamp_us = self.sim_time_us;
    }

    fn synthesize_filtered_accel(&mut self) {
        for axis in 0..3 {
            self.snapshot.accel_100hz[axis] = self.snapshot.accel_500hz[axis];
        }
        self.snapshot.accel_100hz_stamp_us = self.sim_time_us;
    }

    fn synthesize_baro(&mut self) {
        self.snapshot.pressure_alt_50hz =
            self.state.alt_m + self.gaussian(self.config.baro_noise_m);
        self.snapshot.baro_stamp_us = self.sim_time_us;
    }

    fn synthesize_mag(&mut self) {
        // Horizontal field pointing magnetic north, rotated into the
        // body frame (level-vehicle approximation)
        let yaw = self.state.attitude[YAW];
        self.snapshot.mag_10hz = [yaw.cos(), -yaw.sin(), 0.0];
        self.snapshot.mag_stamp_us = self.sim_time_us;
    }

    fn synthesize_gps(&mut self) {
        let (n, e) = self.state.pos_ne_m;
        let n = n + self.gaussian(self.config.gps_noise_m);
        let e = e + self.gaussian(self.config.gps_noise_m);

        let m_per_deg_lon = M_PER_DEG_LAT * self.config.origin_lat_deg.to_radians().cos();
        let (vn, ve) = self.state.vel_ne_mps;
        let speed = (vn * vn + ve * ve).sqrt();
        let track = if speed > 0.01 {
            let track = ve.atan2(vn).to_degrees();
            if track < 0.0 {
                track + 360.0
            } else {
                track
            }
        } else {
            0.0
        };

        self.gps = GpsFix {
            lat_deg: self.config.origin_lat_deg + n / M_PER_DEG_LAT,
            lon_deg: self.config.origin_lon_deg + e / m_per_deg_lon,
            alt_m: self.state.alt_m,
            ground_speed_mps: speed,
            ground_track_deg: track,
            num_sats: 12,
            quality: self.config.fix_quality,
            date: 80825,
            utc_s: self.sim_time_us as f32 / 1_000_000.0,
            hdop: 0.8,
        };
    }

    /// Gaussian noise via the Box-Muller transform.
    fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev == 0.0 {
            return 0.0;
        }
        let u1: f32 = self.rng.gen::<f32>().max(f32::EPSILON);
        let u2: f32 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
        z * stddev
    }

    /// Changes the reported fix quality (fix-loss scenarios).
    pub fn set_fix_quality(&mut self, quality: FixQuality) {
        self.config.fix_quality = quality;
        self.gps.quality = quality;
    }

    /// Current sensor snapshot.
    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    /// Current GPS fix.
    pub fn gps(&self) -> &GpsFix {
        &self.gps
    }

    /// Simulated time in microseconds.
    pub fn sim_time_us(&self) -> u64 {
        self.sim_time_us
    }

    /// Step size in microseconds.
    pub fn step_size_us(&self) -> u64 {
        self.config.step_size_us
    }

    /// True attitude (roll, pitch, yaw) in radians.
    pub fn attitude(&self) -> [f32; 3] {
        self.state.attitude
    }

    /// True altitude in meters.
    pub fn altitude_m(&self) -> f32 {
        self.state.alt_m
    }

    /// True climb rate in m/s.
    pub fn climb_rate_mps(&self) -> f32 {
        self.state.climb_mps
    }

    /// True north/east position in meters from the origin.
    pub fn position_ne_m(&self) -> (f32, f32) {
        self.state.pos_ne_m
    }

    /// Tips the vehicle to a given attitude (test setup).
    pub fn set_attitude(&mut self, roll_rad: f32, pitch_rad: f32, yaw_rad: f32) {
        self.state.attitude = [roll_rad, pitch_rad, yaw_rad];
        self.synthesize_inertial();
        self.synthesize_mag();
    }

    /// Places the vehicle at an altitude (test setup).
    pub fn set_altitude(&mut self, alt_m: f32) {
        self.state.alt_m = alt_m;
        self.synthesize_baro();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hover_commands() -> ActuatorCommands {
        ActuatorCommands {
            throttle: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn hover_throttle_holds_altitude() {
        let mut plant = QuadPlant::new(PlantConfig::noiseless(7));
        plant.set_altitude(10.0);
        plant.apply_commands(hover_commands());
        for _ in 0..500 {
            plant.step();
        }
        assert!(
            (plant.altitude_m() - 10.0).abs() < 0.01,
            "got {}",
            plant.altitude_m()
        );
    }

    #[test]
    fn excess_throttle_climbs() {
        let mut plant = QuadPlant::new(PlantConfig::noiseless(7));
        plant.apply_commands(ActuatorCommands {
            throttle: 0.7,
            ..Default::default()
        });
        for _ in 0..500 {
            plant.step();
        }
        assert!(plant.altitude_m() > 1.0, "got {}", plant.altitude_m());
        assert!(plant.climb_rate_mps() > 0.0);
    }

    #[test]
    fn roll_command_rolls_right_and_drifts() {
        let mut plant = QuadPlant::new(PlantConfig::noiseless(7));
        plant.set_altitude(50.0);
        plant.apply_commands(ActuatorCommands {
            roll: 0.1,
            throttle: 0.5,
            ..Default::default()
        });
        for _ in 0..500 {
            plant.step();
        }
        assert!(plant.attitude()[ROLL] > 0.0);
        // Rightward lean at yaw 0 accelerates east
        assert!(plant.position_ne_m().1 > 0.0);
    }

    #[test]
    fn sensor_groups_update_at_their_rates() {
        let mut plant = QuadPlant::new(PlantConfig::noiseless(7));
        plant.apply_commands(hover_commands());

        // After 9 steps the 50 Hz baro has refreshed once at most
        for _ in 0..9 {
            plant.step();
        }
        let baro_stamp = plant.snapshot().baro_stamp_us;
        plant.step(); // step 10: baro due
        assert!(plant.snapshot().baro_stamp_us > baro_stamp);

        // Inertial stamp tracks every step
        assert_eq!(plant.snapshot().inertial_stamp_us, plant.sim_time_us());
    }

    #[test]
    fn deterministic_with_same_seed() {
        let run = |seed: u64| {
            let config = PlantConfig {
                seed: Some(seed),
                ..Default::default()
            };
            let mut plant = QuadPlant::new(config);
            plant.apply_commands(ActuatorCommands {
                roll: 0.05,
                throttle: 0.6,
                ..Default::default()
            });
            for _ in 0..200 {
                plant.step();
            }
            (plant.snapshot().gyro_500hz, plant.position_ne_m())
        };

        assert_eq!(run(42), run(42));
    }

    #[test]
    fn gps_reflects_motion() {
        let mut plant = QuadPlant::new(PlantConfig::noiseless(7));
        plant.set_altitude(30.0);
        plant.apply_commands(ActuatorCommands {
            pitch: 0.1,
            throttle: 0.5,
            ..Default::default()
        });
        for _ in 0..2_000 {
            plant.step();
        }
        // Forward lean at yaw 0 moves north: latitude grows
        assert!(plant.gps().lat_deg > PlantConfig::default().origin_lat_deg);
        assert!(plant.gps().ground_speed_mps > 0.1);
    }
}
