//! Read-only state snapshot for the telemetry/OSD collaborator.
//!
//! Everything here is a copy taken at the end of a cycle; no component
//! outside the control task ever holds a reference into live PID or
//! mode state.

use crate::fault::FaultFlags;
use crate::mode::{FlightMode, VerticalMode};
use crate::pid::PidRole;
use crate::scheduler::CycleStats;

/// Per-cycle telemetry copy.
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySnapshot {
    /// Active flight mode.
    pub flight_mode: FlightMode,
    /// Active vertical mode.
    pub vertical_mode: VerticalMode,
    /// Armed state.
    pub armed: bool,
    /// Integral accumulators of all twelve channels, in role order.
    pub integrators: [f32; PidRole::COUNT],
    /// Faults raised by the last cycle.
    pub faults: FaultFlags,
    /// Configuration history is known-bad.
    pub history_bad: bool,
    /// Timing counters of the periodic task.
    pub cycle_stats: CycleStats,
}
