//! Lockstep harness wiring the plant to the control core.
//!
//! Each step advances the mock clock by one plant step, feeds the
//! plant's sensors into the control cycle, and routes the resulting
//! command vector back into the plant. Fault transitions are logged
//! through the `log` facade.

use log::{info, warn};

use quad_pilot_core::config::FlightConfig;
use quad_pilot_core::control::{
    ActuatorCommands, ControlCycle, CycleInputs, CycleOutcome, GuidanceTarget, PilotInput,
};
use quad_pilot_core::fault::FaultFlags;
use quad_pilot_core::telemetry::TelemetrySnapshot;
use quad_pilot_core::traits::{MockTime, TimeSource};

use crate::plant::{PlantConfig, QuadPlant};

/// Plant + control core in lockstep.
pub struct SitlHarness {
    time: MockTime,
    plant: QuadPlant,
    cycle: ControlCycle,
    /// Pilot input fed to every cycle; mutate between steps.
    pub pilot: PilotInput,
    /// Guidance references fed to every cycle.
    pub guidance: GuidanceTarget,
    last_outcome: Option<CycleOutcome>,
    prev_faults: FaultFlags,
}

impl SitlHarness {
    /// Builds a harness from a config record and plant configuration.
    pub fn new(config: FlightConfig, plant_config: PlantConfig) -> Self {
        Self {
            time: MockTime::new(),
            plant: QuadPlant::new(plant_config),
            cycle: ControlCycle::new(config),
            pilot: PilotInput::default(),
            guidance: GuidanceTarget::default(),
            last_outcome: None,
            prev_faults: FaultFlags::empty(),
        }
    }

    /// Deterministic noiseless harness with default gains, arm counts
    /// shortened for tests.
    pub fn deterministic(seed: u64) -> Self {
        let mut config = FlightConfig::safe_defaults();
        config.arm_count = 2;
        config.disarm_count = 2;
        Self::new(config, PlantConfig::noiseless(seed))
    }

    /// Runs one lockstep iteration and returns the cycle outcome.
    pub fn step(&mut self) -> CycleOutcome {
        self.time.advance(self.plant.step_size_us());
        self.plant.step();

        let inputs = CycleInputs {
            snapshot: self.plant.snapshot(),
            gps: self.plant.gps(),
            pilot: &self.pilot,
            guidance: &self.guidance,
        };
        let outcome = self.cycle.run(&inputs, self.time.now_us());
        self.plant.apply_commands(outcome.commands);

        if outcome.faults != self.prev_faults {
            if outcome.faults.is_empty() {
                info!("faults cleared");
            } else {
                warn!("fault state now {:?}", outcome.faults);
            }
            self.prev_faults = outcome.faults;
        }

        self.last_outcome = Some(outcome);
        outcome
    }

    /// Runs `n` lockstep iterations.
    pub fn run_cycles(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Runs the arm gesture until the core reports armed.
    ///
    /// # Panics
    ///
    /// Panics if the core does not arm within 1000 cycles.
    pub fn arm(&mut self) {
        self.pilot.arm_switch = true;
        self.pilot.throttle = 0.0;
        for _ in 0..1_000 {
            if self.step().armed {
                info!("armed after {} us", self.time_us());
                return;
            }
        }
        panic!("control core failed to arm");
    }

    /// Outcome of the most recent step.
    pub fn last_outcome(&self) -> Option<&CycleOutcome> {
        self.last_outcome.as_ref()
    }

    /// Commands currently driving the plant.
    pub fn commands(&self) -> ActuatorCommands {
        self.cycle.last_commands()
    }

    /// Telemetry snapshot from the control core.
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.cycle.telemetry()
    }

    /// The simulated plant.
    pub fn plant(&self) -> &QuadPlant {
        &self.plant
    }

    /// Mutable plant access for scenario setup.
    pub fn plant_mut(&mut self) -> &mut QuadPlant {
        &mut self.plant
    }

    /// Simulated time in microseconds.
    pub fn time_us(&self) -> u64 {
        self.time.now_us()
    }
}
