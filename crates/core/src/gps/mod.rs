//! GPS fix record and fix-quality gating.
//!
//! The receiver driver (external) replaces the whole fix on every
//! message; nothing in here is updated field-by-field. Fix quality gates
//! whether the GPS-derived cascade stages may run at all.

use libm::{cosf, sinf};

/// Receiver confidence classification, wire codes included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixQuality {
    /// No position solution.
    #[default]
    NoFix,
    /// 2D solution, altitude untrustworthy.
    Fix2d,
    /// Full 3D solution.
    Fix3d,
    /// 2D solution with SBAS corrections.
    Fix2dSbas,
    /// 3D solution with SBAS corrections.
    Fix3dSbas,
}

impl FixQuality {
    /// Decodes the receiver's quality code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(FixQuality::NoFix),
            2 => Some(FixQuality::Fix2d),
            3 => Some(FixQuality::Fix3d),
            6 => Some(FixQuality::Fix2dSbas),
            7 => Some(FixQuality::Fix3dSbas),
            _ => None,
        }
    }

    /// The receiver's wire code for this quality.
    pub fn code(self) -> u8 {
        match self {
            FixQuality::NoFix => 1,
            FixQuality::Fix2d => 2,
            FixQuality::Fix3d => 3,
            FixQuality::Fix2dSbas => 6,
            FixQuality::Fix3dSbas => 7,
        }
    }

    /// True for 3D-class solutions.
    pub fn is_3d(self) -> bool {
        matches!(self, FixQuality::Fix3d | FixQuality::Fix3dSbas)
    }
}

/// One complete receiver fix, replaced wholesale on arrival.
#[derive(Debug, Clone, Copy, Default)]
pub struct GpsFix {
    /// Latitude in degrees.
    pub lat_deg: f32,
    /// Longitude in degrees.
    pub lon_deg: f32,
    /// Altitude above MSL in meters.
    pub alt_m: f32,
    /// Ground speed in m/s.
    pub ground_speed_mps: f32,
    /// Ground track in degrees, [0, 360).
    pub ground_track_deg: f32,
    /// Satellites used in the solution.
    pub num_sats: u8,
    /// Solution quality.
    pub quality: FixQuality,
    /// UTC date as DDMMYY.
    pub date: u32,
    /// UTC time of day in seconds.
    pub utc_s: f32,
    /// Horizontal dilution of precision.
    pub hdop: f32,
}

impl GpsFix {
    /// Whether the GPS cascade stages may consume this fix.
    ///
    /// Only 3D-class solutions qualify: a 2D fix carries no trustworthy
    /// altitude and its horizontal solution degrades unpredictably.
    pub fn usable_for_navigation(&self) -> bool {
        self.quality.is_3d()
            && self.lat_deg.is_finite()
            && self.lon_deg.is_finite()
            && self.ground_speed_mps.is_finite()
            && self.ground_track_deg.is_finite()
    }

    /// North/east velocity components in m/s, from speed and track.
    pub fn velocity_ne(&self) -> (f32, f32) {
        let track_rad = self.ground_track_deg.to_radians();
        (
            self.ground_speed_mps * cosf(track_rad),
            self.ground_speed_mps * sinf(track_rad),
        )
    }
}

/// Meters per degree of latitude (flat-earth, small offsets).
const M_PER_DEG_LAT: f32 = 111_320.0;

/// North/east offset in meters from `origin` to `to`.
///
/// Flat-earth approximation; valid for the sub-kilometer offsets the
/// position loop works with.
pub fn offset_ne_m(origin_lat: f32, origin_lon: f32, to_lat: f32, to_lon: f32) -> (f32, f32) {
    let north = (to_lat - origin_lat) * M_PER_DEG_LAT;
    let east = (to_lon - origin_lon) * M_PER_DEG_LAT * cosf(origin_lat.to_radians());
    (north, east)
}
