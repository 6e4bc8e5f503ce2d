//! Flight-mode and vertical-mode state machines.
//!
//! The two mode axes are independent: [`FlightMode`] selects how many
//! cascade stages run on the horizontal axes, [`VerticalMode`] selects
//! which vertical roles run and where their setpoint comes from. All
//! transition logic lives in [`ModeStateMachine`]; it reports which PID
//! roles must be reset and the control cycle applies those resets to
//! the bank it owns.

mod flight;
mod machine;
mod vertical;

pub use flight::FlightMode;
pub use machine::{ModeInputs, ModeStateMachine, Transition, THROTTLE_REENGAGE_BAND};
pub use vertical::VerticalMode;
