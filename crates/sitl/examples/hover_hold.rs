//! Arms the vehicle, climbs, engages altitude hold and reports what
//! the controller is doing. Run with `RUST_LOG=info` for fault logs.

use quad_pilot_sitl::SitlHarness;

fn main() {
    env_logger::init();

    let mut harness = SitlHarness::deterministic(2024);

    harness.arm();
    println!("armed at t={} ms", harness.time_us() / 1000);

    // Climb for four seconds on raw throttle
    harness.pilot.throttle = 0.65;
    harness.run_cycles(2_000);
    println!(
        "t={:>5} ms  alt={:6.2} m  climb={:5.2} m/s",
        harness.time_us() / 1000,
        harness.plant().altitude_m(),
        harness.plant().climb_rate_mps(),
    );

    // Engage altitude hold and watch it settle
    harness.pilot.hold_engaged = true;
    for _ in 0..10 {
        harness.run_cycles(500); // one second per row
        let telemetry = harness.telemetry();
        println!(
            "t={:>5} ms  alt={:6.2} m  climb={:5.2} m/s  mode={:?}/{:?}  throttle={:.3}",
            harness.time_us() / 1000,
            harness.plant().altitude_m(),
            harness.plant().climb_rate_mps(),
            telemetry.flight_mode,
            telemetry.vertical_mode,
            harness.commands().throttle,
        );
    }

    let stats = harness.telemetry().cycle_stats;
    println!(
        "cycles={}  deadline_misses={}  avg_jitter={} us",
        stats.cycle_count, stats.deadline_misses, stats.avg_jitter_us
    );
}
