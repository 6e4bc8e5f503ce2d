//! The fixed-period control orchestrator.
//!
//! One [`ControlCycle`] invocation per 500 Hz period: snapshot the
//! inputs, run the mode machine, evaluate the selected PID cascade in
//! outer-to-inner order, and emit the per-axis command vector for the
//! external mixer.

mod commands;
mod cycle;
mod inputs;

pub use commands::ActuatorCommands;
pub use cycle::{ControlCycle, CycleInputs, CycleOutcome, YAW_STICK_DEADBAND};
pub use inputs::{GuidanceTarget, PilotInput};
