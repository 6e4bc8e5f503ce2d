//! The persisted configuration record.
//!
//! Everything the control core is seeded with at boot lives here:
//! calibration coefficients, fusion filter gains, command scaling, the
//! twelve PID gain sets, receiver and mixer calibration, and the option
//! flags the external collaborators read. The record is serialized with
//! explicit fixed-offset little-endian encode/decode — never by memory
//! layout — and versioned: the current loader also migrates records one
//! version back by defaulting the appended fields.

use crate::pid::{PidGains, PidRole};

/// Current record version.
pub const CONFIG_VERSION: u16 = 2;

/// Oldest version the loader can migrate forward.
pub const CONFIG_VERSION_MIN: u16 = 1;

/// Serialized payload size of the current version, in bytes.
pub const PAYLOAD_SIZE: usize = 449;

/// Serialized payload size of version 1 (no external sensor flags).
pub const PAYLOAD_SIZE_V1: usize = PAYLOAD_SIZE - 2;

const HISTORY_BAD: u8 = 1 << 0;

/// Accelerometer low-pass configuration of the inertial sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DlpfSetting {
    /// 256 Hz bandwidth.
    Hz256,
    /// 188 Hz bandwidth.
    Hz188,
    /// 98 Hz bandwidth.
    #[default]
    Hz98,
    /// 42 Hz bandwidth.
    Hz42,
}

impl DlpfSetting {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DlpfSetting::Hz256),
            1 => Some(DlpfSetting::Hz188),
            2 => Some(DlpfSetting::Hz98),
            3 => Some(DlpfSetting::Hz42),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        self as u8
    }
}

/// Receiver hardware attached to the command decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverType {
    /// No receiver configured.
    None,
    /// One PWM line per channel.
    #[default]
    ParallelPwm,
    /// Combined PPM stream.
    SerialPwm,
    /// Spektrum satellite serial protocol.
    Spektrum,
}

impl ReceiverType {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ReceiverType::None),
            1 => Some(ReceiverType::ParallelPwm),
            2 => Some(ReceiverType::SerialPwm),
            3 => Some(ReceiverType::Spektrum),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        self as u8
    }
}

/// Airframe topology the external mixer implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixerType {
    /// Tricopter with yaw servo.
    Tri,
    /// Quadrotor, X orientation.
    #[default]
    QuadX,
    /// Hexacopter, X orientation.
    Hex6X,
}

impl MixerType {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(MixerType::Tri),
            1 => Some(MixerType::QuadX),
            2 => Some(MixerType::Hex6X),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        self as u8
    }
}

/// GPS receiver protocol spoken by the external driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpsReceiverType {
    /// No GPS fitted.
    None,
    /// MediaTek 3329, binary protocol.
    MediatekBinary,
    /// MediaTek 3329, NMEA sentences.
    MediatekNmea,
    /// u-blox UBX protocol.
    #[default]
    Ublox,
}

impl GpsReceiverType {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GpsReceiverType::None),
            1 => Some(GpsReceiverType::MediatekBinary),
            2 => Some(GpsReceiverType::MediatekNmea),
            3 => Some(GpsReceiverType::Ublox),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        self as u8
    }
}

/// OSD rendering options, persisted for the external OSD collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OsdOptions {
    /// OSD overlay enabled at all.
    pub enabled: bool,
    /// 0 = NTSC, 1 = PAL.
    pub video_standard: u8,
    /// Metric units on the overlay.
    pub metric_units: bool,
    /// Show altitude.
    pub display_altitude: bool,
    /// Altitude field row.
    pub altitude_row: u8,
    /// Altitude field column.
    pub altitude_col: u8,
    /// Show the vertical-mode state next to altitude.
    pub display_altitude_hold_state: bool,
    /// Show the artificial horizon.
    pub display_horizon: bool,
    /// Show numeric attitude.
    pub display_attitude: bool,
    /// Show heading.
    pub display_heading: bool,
    /// Heading field row.
    pub heading_row: u8,
    /// Heading field column.
    pub heading_col: u8,
}

/// The full persisted configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightConfig {
    /// Accel temperature-compensation bias slope per axis.
    pub accel_tc_bias_slope: [f32; 3],
    /// Accel temperature-compensation bias intercept per axis.
    pub accel_tc_bias_intercept: [f32; 3],
    /// Gyro temperature-compensation bias slope per axis.
    pub gyro_tc_bias_slope: [f32; 3],
    /// Gyro temperature-compensation bias intercept per axis.
    pub gyro_tc_bias_intercept: [f32; 3],
    /// Magnetometer hard-iron bias per axis.
    pub mag_bias: [f32; 3],
    /// Accel vector rejection cutoff for the fusion stage.
    pub accel_cutoff: f32,

    /// Accel correction proportional gain (complementary filter).
    pub kp_acc: f32,
    /// Accel correction integral gain.
    pub ki_acc: f32,
    /// Mag correction proportional gain.
    pub kp_mag: f32,
    /// Mag correction integral gain.
    pub ki_mag: f32,
    /// Complementary filter blend constant A.
    pub comp_filter_a: f32,
    /// Complementary filter blend constant B.
    pub comp_filter_b: f32,
    /// Inertial sensor low-pass setting.
    pub dlpf: DlpfSetting,

    /// Full-stick angular rate in rad/s (rate mode).
    pub rate_scaling: f32,
    /// Full-stick lean angle in radians (attitude mode).
    pub attitude_scaling: f32,
    /// Full-deflection horizontal velocity in m/s (GPS mode).
    pub ne_velocity_scaling: f32,
    /// Full-deflection climb rate in m/s (velocity hold).
    pub vertical_velocity_scaling: f32,

    /// Receiver hardware type.
    pub receiver: ReceiverType,
    /// Spektrum satellite channel count.
    pub spektrum_channels: u8,
    /// Spektrum high-resolution frames.
    pub spektrum_hires: bool,
    /// Input channel to function mapping.
    pub rc_map: [u8; 8],
    /// ESC update rate in Hz.
    pub esc_pwm_rate: u16,
    /// Servo update rate in Hz.
    pub servo_pwm_rate: u16,
    /// Receiver mid-stick calibration, raw command units.
    pub mid_command: f32,
    /// Low-stick detection threshold, raw command units.
    pub min_check: f32,
    /// High-stick detection threshold, raw command units.
    pub max_check: f32,
    /// Idle throttle output, raw command units.
    pub min_throttle: f32,
    /// Full throttle output, raw command units.
    pub max_throttle: f32,

    /// Airframe topology for the external mixer.
    pub mixer: MixerType,
    /// Yaw output sign for the mixer.
    pub yaw_direction: f32,
    /// Tricopter yaw servo update rate in Hz.
    pub tri_yaw_servo_pwm_rate: u16,
    /// Tricopter yaw servo low endpoint.
    pub tri_yaw_servo_min: f32,
    /// Tricopter yaw servo center.
    pub tri_yaw_servo_mid: f32,
    /// Tricopter yaw servo high endpoint.
    pub tri_yaw_servo_max: f32,

    /// Gains for all twelve PID roles, indexed by [`PidRole`].
    pub pid_gains: [PidGains; PidRole::COUNT],

    /// OSD options for the external renderer.
    pub osd: OsdOptions,

    /// GPS receiver protocol.
    pub gps_type: GpsReceiverType,
    /// GPS port baud rate.
    pub gps_baud_rate: u32,

    /// Magnetic variation in degrees, + east / - west.
    pub mag_variation_deg: f32,

    /// Battery cell count for the voltage monitor.
    pub battery_cells: u8,
    /// Voltage divider scale.
    pub voltage_scale: f32,
    /// Voltage divider bias.
    pub voltage_bias: f32,

    /// Consecutive low-stick cycles required to arm.
    pub arm_count: u8,
    /// Consecutive low-stick cycles required to disarm.
    pub disarm_count: u8,

    /// Telemetry stream selection bitmask.
    pub active_telemetry: u16,
    /// Altitude holds always engage as velocity hold.
    pub vertical_velocity_hold_only: bool,
    /// External magnetometer fitted.
    pub external_mag: bool,
    /// External barometer fitted.
    pub external_baro: bool,

    /// Configuration history is known-bad (defaults were substituted at
    /// some point and the record has not been deliberately re-saved).
    /// Persistent: survives save/load until explicitly cleared.
    pub history_bad: bool,
}

impl FlightConfig {
    /// The hard-coded safe-default record.
    pub fn safe_defaults() -> Self {
        Self {
            accel_tc_bias_slope: [0.0; 3],
            accel_tc_bias_intercept: [0.0; 3],
            gyro_tc_bias_slope: [0.0; 3],
            gyro_tc_bias_intercept: [0.0; 3],
            mag_bias: [0.0; 3],
            accel_cutoff: 1.0,

            kp_acc: 5.0,
            ki_acc: 0.0,
            kp_mag: 5.0,
            ki_mag: 0.0,
            comp_filter_a: 2.0,
            comp_filter_b: 1.0,
            dlpf: DlpfSetting::Hz98,

            rate_scaling: 3.5,
            attitude_scaling: 0.61,
            ne_velocity_scaling: 5.0,
            vertical_velocity_scaling: 2.0,

            receiver: ReceiverType::ParallelPwm,
            spektrum_channels: 7,
            spektrum_hires: false,
            rc_map: [0, 1, 2, 3, 4, 5, 6, 7],
            esc_pwm_rate: 450,
            servo_pwm_rate: 50,
            mid_command: 3000.0,
            min_check: 2200.0,
            max_check: 3800.0,
            min_throttle: 2050.0,
            max_throttle: 4000.0,

            mixer: MixerType::QuadX,
            yaw_direction: 1.0,
            tri_yaw_servo_pwm_rate: 50,
            tri_yaw_servo_min: 2000.0,
            tri_yaw_servo_mid: 3000.0,
            tri_yaw_servo_max: 4000.0,

            pid_gains: default_pid_gains(),

            osd: OsdOptions::default(),

            gps_type: GpsReceiverType::Ublox,
            gps_baud_rate: 38_400,

            mag_variation_deg: 0.0,

            battery_cells: 3,
            voltage_scale: 11.0,
            voltage_bias: 0.0,

            arm_count: 50,
            disarm_count: 25,

            active_telemetry: 0,
            vertical_velocity_hold_only: false,
            external_mag: false,
            external_baro: false,

            history_bad: false,
        }
    }

    /// Serializes the current-version payload into `buf`.
    pub fn encode(&self, buf: &mut [u8; PAYLOAD_SIZE]) {
        let mut w = Writer::new(buf);

        w.vec3(&self.accel_tc_bias_slope);
        w.vec3(&self.accel_tc_bias_intercept);
        w.vec3(&self.gyro_tc_bias_slope);
        w.vec3(&self.gyro_tc_bias_intercept);
        w.vec3(&self.mag_bias);
        w.f32(self.accel_cutoff);

        w.f32(self.kp_acc);
        w.f32(self.ki_acc);
        w.f32(self.kp_mag);
        w.f32(self.ki_mag);
        w.f32(self.comp_filter_a);
        w.f32(self.comp_filter_b);
        w.u8(self.dlpf.code());

        w.f32(self.rate_scaling);
        w.f32(self.attitude_scaling);
        w.f32(self.ne_velocity_scaling);
        w.f32(self.vertical_velocity_scaling);

        w.u8(self.receiver.code());
        w.u8(self.spektrum_channels);
        w.bool(self.spektrum_hires);
        w.bytes(&self.rc_map);
        w.u16(self.esc_pwm_rate);
        w.u16(self.servo_pwm_rate);
        w.f32(self.mid_command);
        w.f32(self.min_check);
        w.f32(self.max_check);
        w.f32(self.min_throttle);
        w.f32(self.max_throttle);

        w.u8(self.mixer.code());
        w.f32(self.yaw_direction);
        w.u16(self.tri_yaw_servo_pwm_rate);
        w.f32(self.tri_yaw_servo_min);
        w.f32(self.tri_yaw_servo_mid);
        w.f32(self.tri_yaw_servo_max);

        for gains in &self.pid_gains {
            w.f32(gains.kp);
            w.f32(gains.ki);
            w.f32(gains.kd);
            w.f32(gains.integrator_limit);
            w.f32(gains.output_limit);
            w.bool(gains.derivative_on_measurement);
        }

        w.bool(self.osd.enabled);
        w.u8(self.osd.video_standard);
        w.bool(self.osd.metric_units);
        w.bool(self.osd.display_altitude);
        w.u8(self.osd.altitude_row);
        w.u8(self.osd.altitude_col);
        w.bool(self.osd.display_altitude_hold_state);
        w.bool(self.osd.display_horizon);
        w.bool(self.osd.display_attitude);
        w.bool(self.osd.display_heading);
        w.u8(self.osd.heading_row);
        w.u8(self.osd.heading_col);

        w.u8(self.gps_type.code());
        w.u32(self.gps_baud_rate);

        w.f32(self.mag_variation_deg);

        w.u8(self.battery_cells);
        w.f32(self.voltage_scale);
        w.f32(self.voltage_bias);

        w.u8(self.arm_count);
        w.u8(self.disarm_count);

        w.u16(self.active_telemetry);
        w.bool(self.vertical_velocity_hold_only);
        w.bool(self.external_mag);
        w.bool(self.external_baro);

        let flags = if self.history_bad { HISTORY_BAD } else { 0 };
        w.u8(flags);

        debug_assert_eq!(w.position(), PAYLOAD_SIZE);
    }

    /// Expected payload size for a record of `version`.
    pub fn payload_size_for(version: u16) -> Option<usize> {
        match version {
            1 => Some(PAYLOAD_SIZE_V1),
            CONFIG_VERSION => Some(PAYLOAD_SIZE),
            _ => None,
        }
    }

    /// Deserializes a payload of the given version, defaulting fields
    /// the older layout lacks. Returns `None` on framing or enum-code
    /// violations.
    pub fn decode(version: u16, buf: &[u8]) -> Option<Self> {
        if Self::payload_size_for(version)? != buf.len() {
            return None;
        }
        let mut r = Reader::new(buf);

        let accel_tc_bias_slope = r.vec3()?;
        let accel_tc_bias_intercept = r.vec3()?;
        let gyro_tc_bias_slope = r.vec3()?;
        let gyro_tc_bias_intercept = r.vec3()?;
        let mag_bias = r.vec3()?;
        let accel_cutoff = r.f32()?;

        let kp_acc = r.f32()?;
        let ki_acc = r.f32()?;
        let kp_mag = r.f32()?;
        let ki_mag = r.f32()?;
        let comp_filter_a = r.f32()?;
        let comp_filter_b = r.f32()?;
        let dlpf = DlpfSetting::from_code(r.u8()?)?;

        let rate_scaling = r.f32()?;
        let attitude_scaling = r.f32()?;
        let ne_velocity_scaling = r.f32()?;
        let vertical_velocity_scaling = r.f32()?;

        let receiver = ReceiverType::from_code(r.u8()?)?;
        let spektrum_channels = r.u8()?;
        let spektrum_hires = r.bool()?;
        let rc_map = r.array::<8>()?;
        let esc_pwm_rate = r.u16()?;
        let servo_pwm_rate = r.u16()?;
        let mid_command = r.f32()?;
        let min_check = r.f32()?;
        let max_check = r.f32()?;
        let min_throttle = r.f32()?;
        let max_throttle = r.f32()?;

        let mixer = MixerType::from_code(r.u8()?)?;
        let yaw_direction = r.f32()?;
        let tri_yaw_servo_pwm_rate = r.u16()?;
        let tri_yaw_servo_min = r.f32()?;
        let tri_yaw_servo_mid = r.f32()?;
        let tri_yaw_servo_max = r.f32()?;

        let mut pid_gains = [PidGains::disabled(); PidRole::COUNT];
        for gains in pid_gains.iter_mut() {
            *gains = PidGains {
                kp: r.f32()?,
                ki: r.f32()?,
                kd: r.f32()?,
                integrator_limit: r.f32()?,
                output_limit: r.f32()?,
                derivative_on_measurement: r.bool()?,
            };
        }

        let osd = OsdOptions {
            enabled: r.bool()?,
            video_standard: r.u8()?,
            metric_units: r.bool()?,
            display_altitude: r.bool()?,
            altitude_row: r.u8()?,
            altitude_col: r.u8()?,
            display_altitude_hold_state: r.bool()?,
            display_horizon: r.bool()?,
            display_attitude: r.bool()?,
            display_heading: r.bool()?,
            heading_row: r.u8()?,
            heading_col: r.u8()?,
        };

        let gps_type = GpsReceiverType::from_code(r.u8()?)?;
        let gps_baud_rate = r.u32()?;

        let mag_variation_deg = r.f32()?;

        let battery_cells = r.u8()?;
        let voltage_scale = r.f32()?;
        let voltage_bias = r.f32()?;

        let arm_count = r.u8()?;
        let disarm_count = r.u8()?;

        let active_telemetry = r.u16()?;
        let vertical_velocity_hold_only = r.bool()?;

        // Version 2 appended the external sensor flags
        let (external_mag, external_baro) = if version >= 2 {
            (r.bool()?, r.bool()?)
        } else {
            (false, false)
        };

        let flags = r.u8()?;

        Some(Self {
            accel_tc_bias_slope,
            accel_tc_bias_intercept,
            gyro_tc_bias_slope,
            gyro_tc_bias_intercept,
            mag_bias,
            accel_cutoff,
            kp_acc,
            ki_acc,
            kp_mag,
            ki_mag,
            comp_filter_a,
            comp_filter_b,
            dlpf,
            rate_scaling,
            attitude_scaling,
            ne_velocity_scaling,
            vertical_velocity_scaling,
            receiver,
            spektrum_channels,
            spektrum_hires,
            rc_map,
            esc_pwm_rate,
            servo_pwm_rate,
            mid_command,
            min_check,
            max_check,
            min_throttle,
            max_throttle,
            mixer,
            yaw_direction,
            tri_yaw_servo_pwm_rate,
            tri_yaw_servo_min,
            tri_yaw_servo_mid,
            tri_yaw_servo_max,
            pid_gains,
            osd,
            gps_type,
            gps_baud_rate,
            mag_variation_deg,
            battery_cells,
            voltage_scale,
            voltage_bias,
            arm_count,
            disarm_count,
            active_telemetry,
            vertical_velocity_hold_only,
            external_mag,
            external_baro,
            history_bad: flags & HISTORY_BAD != 0,
        })
    }
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self::safe_defaults()
    }
}

/// Default gain table, by role.
fn default_pid_gains() -> [PidGains; PidRole::COUNT] {
    let mut gains = [PidGains::disabled(); PidRole::COUNT];

    let rate = PidGains {
        kp: 0.15,
        ki: 0.05,
        kd: 0.002,
        integrator_limit: 0.25,
        output_limit: 1.0,
        derivative_on_measurement: true,
    };
    gains[PidRole::RollRate.index()] = rate;
    gains[PidRole::PitchRate.index()] = rate;
    gains[PidRole::YawRate.index()] = PidGains {
        kp: 0.25,
        kd: 0.0,
        ..rate
    };

    let attitude = PidGains {
        kp: 4.0,
        ki: 0.5,
        kd: 0.0,
        integrator_limit: 1.0,
        output_limit: 6.0,
        derivative_on_measurement: false,
    };
    gains[PidRole::RollAttitude.index()] = attitude;
    gains[PidRole::PitchAttitude.index()] = attitude;
    gains[PidRole::Heading.index()] = PidGains {
        kp: 0.04,
        ki: 0.0,
        kd: 0.0,
        integrator_limit: 0.5,
        output_limit: 3.0,
        derivative_on_measurement: false,
    };

    let velocity = PidGains {
        kp: 0.1,
        ki: 0.02,
        kd: 0.0,
        integrator_limit: 0.15,
        output_limit: 0.35,
        derivative_on_measurement: false,
    };
    gains[PidRole::VelocityNorth.index()] = velocity;
    gains[PidRole::VelocityEast.index()] = velocity;
    gains[PidRole::VelocityDown.index()] = PidGains {
        kp: 0.12,
        ki: 0.04,
        kd: 0.0,
        integrator_limit: 0.2,
        output_limit: 0.4,
        derivative_on_measurement: false,
    };

    let position = PidGains {
        kp: 0.3,
        ki: 0.0,
        kd: 0.0,
        integrator_limit: 1.0,
        output_limit: 3.0,
        derivative_on_measurement: false,
    };
    gains[PidRole::PositionNorth.index()] = position;
    gains[PidRole::PositionEast.index()] = position;
    gains[PidRole::Altitude.index()] = PidGains {
        kp: 1.0,
        ki: 0.1,
        kd: 0.0,
        integrator_limit: 1.0,
        output_limit: 2.0,
        derivative_on_measurement: false,
    };

    gains
}

// Fixed-offset little-endian cursor pair. The writer panics past the
// end (caller supplies an exactly sized buffer); the reader returns
// `None` so decode degrades to an integrity failure.

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn bytes(&mut self, data: &[u8]) {
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    fn u8(&mut self, v: u8) {
        self.bytes(&[v]);
    }

    fn bool(&mut self, v: bool) {
        self.u8(v as u8);
    }

    fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.bytes(&v.to_le_bytes());
    }

    fn vec3(&mut self, v: &[f32; 3]) {
        for &x in v {
            self.f32(x);
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let slice = self.buf.get(self.pos..self.pos + N)?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Some(out)
    }

    fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(|[v]| v)
    }

    fn bool(&mut self) -> Option<bool> {
        self.u8().map(|v| v != 0)
    }

    fn u16(&mut self) -> Option<u16> {
        self.array::<2>().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Option<u32> {
        self.array::<4>().map(u32::from_le_bytes)
    }

    fn f32(&mut self) -> Option<f32> {
        self.array::<4>().map(f32::from_le_bytes)
    }

    fn vec3(&mut self) -> Option<[f32; 3]> {
        Some([self.f32()?, self.f32()?, self.f32()?])
    }
}
