//! quad_pilot_sitl - Software-in-the-loop harness for the quad_pilot
//! stabilization core.
//!
//! Provides a lightweight quadrotor plant with per-rate sensor
//! synthesis and a lockstep harness that drives the control core on the
//! host. Used by the integration test suite and the example binaries;
//! no hardware or external simulator required.

pub mod harness;
pub mod plant;

pub use harness::SitlHarness;
pub use plant::{PlantConfig, QuadPlant};
