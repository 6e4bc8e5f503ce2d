//! Magnetic and true heading derivation.
//!
//! Heading comes from the 10 Hz magnetometer vector, tilt-compensated
//! with the fused roll/pitch so the horizontal field components survive
//! bank angles. True heading adds the signed magnetic variation from
//! configuration (+ east, - west) and wraps to [0, 360).

use libm::{atan2f, cosf, sinf};

use super::{SensorSnapshot, PITCH, ROLL};

const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Magnetic and true heading in degrees, [0, 360).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Heading {
    /// Heading relative to magnetic north.
    pub mag_deg: f32,
    /// Heading relative to true north (mag + variation).
    pub true_deg: f32,
}

impl Heading {
    /// Derives both headings from the snapshot's mag vector and attitude.
    pub fn from_snapshot(snapshot: &SensorSnapshot, mag_variation_deg: f32) -> Self {
        let mag_deg = heading_from_mag(
            &snapshot.mag_10hz,
            snapshot.attitude_500hz[ROLL],
            snapshot.attitude_500hz[PITCH],
        );
        Self {
            mag_deg,
            true_deg: wrap_360(mag_deg + mag_variation_deg),
        }
    }
}

/// Tilt-compensated magnetic heading in degrees, [0, 360).
///
/// Rotates the body-frame field vector into the horizontal plane using
/// roll/pitch (radians), then takes the horizontal bearing.
pub fn heading_from_mag(mag: &[f32; 3], roll_rad: f32, pitch_rad: f32) -> f32 {
    let (sin_r, cos_r) = (sinf(roll_rad), cosf(roll_rad));
    let (sin_p, cos_p) = (sinf(pitch_rad), cosf(pitch_rad));

    let mag_x = mag[0] * cos_p + mag[1] * sin_r * sin_p + mag[2] * cos_r * sin_p;
    let mag_y = mag[1] * cos_r - mag[2] * sin_r;

    wrap_360(atan2f(-mag_y, mag_x) * RAD_TO_DEG)
}

/// Wraps an angle in degrees to [0, 360).
pub fn wrap_360(deg: f32) -> f32 {
    let wrapped = deg % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Wraps an angle in degrees to (-180, 180].
pub fn wrap_180(deg: f32) -> f32 {
    let wrapped = wrap_360(deg);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
