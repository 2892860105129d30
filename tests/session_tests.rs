//! Session integration tests
//!
//! Long seeded runs of the whole simulation checking the invariants that
//! must hold at every tick: signal exclusivity, the live-vehicle cap and
//! balanced add/remove events.

use std::cell::RefCell;
use std::rc::Rc;

use intersection_sim::simulation::{
    Axis, FixedClock, GenerationConfig, LightState, SimConfig, SimEvent, SimSession, TimeOfDay,
};

const DELTA: f32 = 0.1;

fn evening_clock() -> FixedClock {
    FixedClock(TimeOfDay {
        day_of_week: 4,
        hour: 20,
        minute: 0,
        second: 0,
    })
}

fn axis_green(session: &SimSession, axis: Axis) -> bool {
    axis.directions()
        .iter()
        .all(|&d| session.light_state(d) == LightState::Green)
}

#[test]
fn test_long_run_holds_invariants() {
    let mut session = SimSession::with_seed(SimConfig::default(), 1234);
    session.set_clock(evening_clock());
    session.start();

    let mut added = 0u64;
    let mut removed = 0u64;
    for _ in 0..3000 {
        let events = session.tick(DELTA);
        for event in &events {
            match event {
                SimEvent::VehicleAdded { .. } => added += 1,
                SimEvent::VehicleRemoved {
                    travel_time,
                    final_speed,
                    ..
                } => {
                    removed += 1;
                    assert!(*travel_time > 0.0);
                    // Vehicles only complete in motion, so the exit speed is
                    // their assigned cruise speed, never zero.
                    assert!(
                        *final_speed > 0.0,
                        "vehicle removed with a zero exit speed at t={}",
                        session.sim_time()
                    );
                }
                _ => {}
            }
        }
        assert!(
            session.live_vehicle_count() <= 40,
            "live-vehicle cap exceeded at t={}",
            session.sim_time()
        );
        assert!(
            !(axis_green(&session, Axis::NorthSouth) && axis_green(&session, Axis::EastWest)),
            "both axes green at t={}",
            session.sim_time()
        );
    }

    assert!(added > 0, "no vehicles spawned in 300s");
    assert!(removed > 0, "no vehicles completed in 300s");
    assert_eq!(session.live_vehicle_count() as u64, added - removed);
    assert_eq!(session.completed_count(), removed);
    assert!(session.generation_stats().total >= added);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        let mut session = SimSession::with_seed(SimConfig::default(), 99);
        session.set_clock(evening_clock());
        session.start();
        for _ in 0..1000 {
            session.tick(DELTA);
        }
        (
            session.generation_stats().total,
            session.completed_count(),
            session.live_vehicle_count(),
        )
    };
    assert_eq!(run(), run());
}

#[test]
fn test_manual_mode_spawns_at_fixed_rate() {
    let mut config = SimConfig::default();
    config.generation = GenerationConfig::manual(1.0);
    let mut session = SimSession::with_seed(config, 7);
    session.set_clock(evening_clock());
    session.start();

    for _ in 0..1000 {
        session.tick(DELTA);
    }
    // 100s at roughly one spawn per second; caps and blocked lane starts
    // absorb some of them.
    let total = session.generation_stats().total;
    assert!(total >= 50, "only {total} spawns in 100s of manual mode");
}

#[test]
fn test_subscriber_observes_events() {
    let seen: Rc<RefCell<u32>> = Rc::default();
    let sink = Rc::clone(&seen);

    let mut session = SimSession::with_seed(SimConfig::default(), 5);
    session.set_clock(evening_clock());
    session.subscribe(move |_event| *sink.borrow_mut() += 1);
    session.start();
    for _ in 0..300 {
        session.tick(DELTA);
    }
    assert!(*seen.borrow() > 0, "subscriber never saw an event");
}

#[test]
fn test_queued_vehicles_drain_after_green() {
    let mut session = SimSession::with_seed(SimConfig::default(), 21);
    session.set_clock(evening_clock());
    session.start();

    // Run long enough for several full cycles; every approach must see
    // completions, which requires queues to drain on green.
    let mut completed_per_direction = std::collections::HashMap::new();
    for _ in 0..6000 {
        for event in session.tick(DELTA) {
            if let SimEvent::VehicleRemoved { direction, .. } = event {
                *completed_per_direction.entry(direction).or_insert(0u32) += 1;
            }
        }
    }
    assert!(
        completed_per_direction.len() == 4,
        "completions missing for some approaches: {completed_per_direction:?}"
    );
}

#[test]
fn test_stopped_session_stops_spawning() {
    let mut session = SimSession::with_seed(SimConfig::default(), 13);
    session.set_clock(evening_clock());
    session.start();
    for _ in 0..600 {
        session.tick(DELTA);
    }
    session.stop();
    assert!(!session.is_running());

    let total_at_stop = session.generation_stats().total;
    for _ in 0..600 {
        session.tick(DELTA);
    }
    assert_eq!(session.generation_stats().total, total_at_stop);
}

#[test]
fn test_flow_snapshot_tracks_spawns() {
    let mut session = SimSession::with_seed(SimConfig::default(), 31);
    session.set_clock(evening_clock());
    session.start();

    // Within the first green there is no reset yet, so the snapshot total
    // matches the add events.
    let mut added = 0u32;
    for _ in 0..100 {
        for event in session.tick(DELTA) {
            if matches!(event, SimEvent::VehicleAdded { .. }) {
                added += 1;
            }
        }
    }
    assert!(added > 0);
    let snapshot = session.flow_snapshot();
    let live_plus_gone = snapshot.grand_total();
    assert_eq!(live_plus_gone, added);
}
