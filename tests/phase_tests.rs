//! Phase controller validation
//!
//! Drives a controller directly, one simulated second per tick, and checks
//! the cycle timing, the prediction hand-off and the fallback heuristic.

use std::collections::VecDeque;

use intersection_sim::simulation::{
    ApproachRecord, Axis, EventBus, FixedClock, FlowAccumulator, FlowConfig, LightState,
    PhaseConfig, PhaseController, PredictionPoll, PredictionResponse, PredictionService,
    SimEvent, SpeedConfig, TimeOfDay, VehicleType, ALL_DIRECTIONS,
};

/// Serves scripted poll outcomes; each submission consumes the next entry
/// and the outcome is returned after the configured number of polls.
struct ScriptedPrediction {
    script: VecDeque<(u32, PredictionPoll)>,
    active: Option<(u32, PredictionPoll)>,
    submissions: u32,
}

impl ScriptedPrediction {
    fn new(script: Vec<(u32, PredictionPoll)>) -> Self {
        Self {
            script: script.into(),
            active: None,
            submissions: 0,
        }
    }
}

impl PredictionService for ScriptedPrediction {
    fn submit(&mut self, _records: Vec<ApproachRecord>) {
        self.submissions += 1;
        self.active = self.script.pop_front();
    }

    fn poll(&mut self) -> PredictionPoll {
        match self.active.take() {
            None => PredictionPoll::Idle,
            Some((0, outcome)) => outcome,
            Some((polls_left, outcome)) => {
                self.active = Some((polls_left - 1, outcome));
                PredictionPoll::Pending
            }
        }
    }
}

fn test_clock() -> FixedClock {
    FixedClock(TimeOfDay {
        day_of_week: 4,
        hour: 20,
        minute: 0,
        second: 0,
    })
}

struct Env {
    controller: PhaseController,
    flow: FlowAccumulator,
    bus: EventBus,
    clock: FixedClock,
    now: f32,
}

impl Env {
    fn new() -> Self {
        Self {
            controller: PhaseController::new(PhaseConfig::default()),
            flow: FlowAccumulator::new(FlowConfig::default(), SpeedConfig::default()),
            bus: EventBus::new(),
            clock: test_clock(),
            now: 0.0,
        }
    }

    fn start(&mut self) {
        self.controller.start(&mut self.bus);
    }

    /// Advance one simulated second
    fn step(&mut self, service: &mut dyn PredictionService) {
        self.now += 1.0;
        self.controller.tick(
            1.0,
            self.now,
            &mut self.flow,
            service,
            &self.clock,
            &mut self.bus,
        );
    }
}

fn axis_is_green(controller: &PhaseController, axis: Axis) -> bool {
    axis.directions()
        .iter()
        .all(|&d| controller.light_state(d) == LightState::Green)
}

#[test]
fn test_initial_phase_is_north_south_green() {
    let mut env = Env::new();
    env.start();

    assert_eq!(env.controller.current_axis(), Axis::NorthSouth);
    assert!(axis_is_green(&env.controller, Axis::NorthSouth));
    for direction in Axis::EastWest.directions() {
        assert_eq!(env.controller.light_state(direction), LightState::Red);
    }
}

#[test]
fn test_axes_never_both_green() {
    let mut env = Env::new();
    let mut service = ScriptedPrediction::new(vec![]);
    env.start();

    for _ in 0..120 {
        env.step(&mut service);
        let ns = axis_is_green(&env.controller, Axis::NorthSouth);
        let ew = axis_is_green(&env.controller, Axis::EastWest);
        assert!(!(ns && ew), "both axes green at t={}", env.now);
    }
}

#[test]
fn test_flip_after_green_plus_yellow() {
    let mut env = Env::new();
    let mut service = ScriptedPrediction::new(vec![]);
    env.start();

    // Default timing: 15s green, 2s yellow.
    for _ in 0..14 {
        env.step(&mut service);
    }
    assert!(axis_is_green(&env.controller, Axis::NorthSouth));
    assert_eq!(env.controller.remaining_seconds(), 1);

    env.step(&mut service);
    for direction in Axis::NorthSouth.directions() {
        assert_eq!(env.controller.light_state(direction), LightState::Yellow);
    }

    env.step(&mut service);
    env.step(&mut service);
    assert_eq!(env.controller.current_axis(), Axis::EastWest);
    assert!(axis_is_green(&env.controller, Axis::EastWest));
    for direction in Axis::NorthSouth.directions() {
        assert_eq!(env.controller.light_state(direction), LightState::Red);
    }
}

#[test]
fn test_prediction_applies_to_next_phase_only() {
    let mut env = Env::new();
    let mut service = ScriptedPrediction::new(vec![(
        0,
        PredictionPoll::Ready(PredictionResponse {
            east_west_seconds: 30,
            south_north_seconds: 20,
        }),
    )]);
    env.start();

    // The request fires at 10s remaining; the response must not touch the
    // running phase.
    for _ in 0..8 {
        env.step(&mut service);
    }
    assert_eq!(service.submissions, 1);
    assert_eq!(env.controller.dynamic_timing().north_south, 15);
    assert_eq!(env.controller.next_timing().east_west, 30);
    assert_eq!(env.controller.next_timing().north_south, 20);

    // Finish green (15) and yellow (2), then the flip applies it.
    for _ in 0..9 {
        env.step(&mut service);
    }
    assert_eq!(env.controller.current_axis(), Axis::EastWest);
    assert_eq!(env.controller.dynamic_timing().east_west, 30);
    assert_eq!(env.controller.remaining_seconds(), 30);
}

#[test]
fn test_out_of_range_prediction_is_clamped() {
    let mut env = Env::new();
    let mut service = ScriptedPrediction::new(vec![(
        0,
        PredictionPoll::Ready(PredictionResponse {
            east_west_seconds: 200,
            south_north_seconds: 1,
        }),
    )]);
    env.start();

    for _ in 0..8 {
        env.step(&mut service);
    }
    assert_eq!(env.controller.next_timing().east_west, 45);
    assert_eq!(env.controller.next_timing().north_south, 8);
}

#[test]
fn test_failed_prediction_falls_back_within_limits() {
    let mut env = Env::new();
    let mut service = ScriptedPrediction::new(vec![(
        0,
        PredictionPoll::Failed("backend unreachable".into()),
    )]);
    env.start();

    for _ in 0..17 {
        env.step(&mut service);
    }
    assert_eq!(env.controller.current_axis(), Axis::EastWest);
    let timing = env.controller.dynamic_timing();
    assert!((8..=45).contains(&timing.east_west));
    assert!((8..=45).contains(&timing.north_south));
    // No traffic recorded: the fallback is the bare baseline.
    assert_eq!(env.controller.remaining_seconds(), 15);

    let events: Vec<SimEvent> = env.bus.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::PredictionDegraded { .. })));
}

#[test]
fn test_pending_prediction_at_flip_uses_fallback() {
    let mut env = Env::new();
    // The answer needs far more polls than the cycle has ticks.
    let mut service = ScriptedPrediction::new(vec![(
        1000,
        PredictionPoll::Ready(PredictionResponse {
            east_west_seconds: 44,
            south_north_seconds: 44,
        }),
    )]);
    env.start();

    for _ in 0..17 {
        env.step(&mut service);
    }
    assert_eq!(env.controller.current_axis(), Axis::EastWest);
    assert_eq!(env.controller.remaining_seconds(), 15);
}

#[test]
fn test_late_response_lands_after_the_flip() {
    let mut env = Env::new();
    // Ready only after more polls than the green has left: the answer
    // arrives four seconds into the next phase.
    let mut service = ScriptedPrediction::new(vec![(
        15,
        PredictionPoll::Ready(PredictionResponse {
            east_west_seconds: 33,
            south_north_seconds: 33,
        }),
    )]);
    env.start();

    // Submit at 10s remaining, flip at 17s with the answer still pending:
    // the fallback covers the new phase.
    for _ in 0..17 {
        env.step(&mut service);
    }
    assert_eq!(service.submissions, 1);
    assert_eq!(env.controller.current_axis(), Axis::EastWest);
    assert_eq!(env.controller.next_timing().east_west, 15);

    // The request keeps being polled across the flip and its answer still
    // lands in the pre-fetched timing for the following cycle.
    for _ in 0..4 {
        env.step(&mut service);
    }
    assert_eq!(env.controller.next_timing().east_west, 33);
    assert_eq!(env.controller.next_timing().north_south, 33);
    // The phase already underway is untouched.
    assert_eq!(env.controller.dynamic_timing().east_west, 15);
}

#[test]
fn test_fallback_scales_with_axis_imbalance() {
    let controller = PhaseController::new(PhaseConfig::default());

    assert_eq!(controller.fallback_duration(0, 0), 15);
    // 30 of 40 vehicles on this axis: 15 + 0.5 * 10 surplus.
    assert_eq!(controller.fallback_duration(30, 40), 20);
    // Extreme imbalance clamps at the maximum.
    assert_eq!(controller.fallback_duration(200, 200), 45);
}

#[test]
fn test_flow_window_resets_at_flip() {
    let mut env = Env::new();
    let mut service = ScriptedPrediction::new(vec![]);
    env.start();

    for direction in ALL_DIRECTIONS {
        env.flow.record_entry(direction, VehicleType::Small, 35.0);
    }
    assert_eq!(env.flow.snapshot(env.now).grand_total(), 4);

    let mut saw_reset = false;
    for _ in 0..17 {
        env.step(&mut service);
        saw_reset |= env
            .bus
            .drain()
            .iter()
            .any(|e| matches!(e, SimEvent::TrafficCycleReset { .. }));
    }
    assert!(saw_reset, "no cycle reset event during a full cycle");
    assert_eq!(env.flow.snapshot(env.now).grand_total(), 0);
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let mut env = Env::new();
    env.start();
    let before = env.controller.remaining_seconds();
    // A second start must not restart the countdown.
    env.controller.start(&mut env.bus);
    assert_eq!(env.controller.remaining_seconds(), before);
    assert!(env.controller.is_running());

    env.controller.stop();
    env.controller.stop();
    assert!(!env.controller.is_running());

    // A stopped controller ignores ticks.
    let mut service = ScriptedPrediction::new(vec![]);
    let axis = env.controller.current_axis();
    for _ in 0..30 {
        env.step(&mut service);
    }
    assert_eq!(env.controller.current_axis(), axis);
}

#[test]
fn test_countdown_callback_reports_each_second() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut env = Env::new();
    let seen: Rc<RefCell<Vec<u32>>> = Rc::default();
    let sink = Rc::clone(&seen);
    env.controller
        .set_countdown_callback(move |_axis, remaining| sink.borrow_mut().push(remaining));
    env.start();

    let mut service = ScriptedPrediction::new(vec![]);
    for _ in 0..5 {
        env.step(&mut service);
    }
    assert_eq!(*seen.borrow(), vec![14, 13, 12, 11, 10]);
}

#[test]
fn test_sub_second_ticks_accumulate() {
    let mut env = Env::new();
    let mut service = ScriptedPrediction::new(vec![]);
    env.start();

    // Ten 0.1s ticks equal one countdown second.
    for i in 0..10 {
        env.now += 0.1;
        env.controller.tick(
            0.1,
            env.now,
            &mut env.flow,
            &mut service,
            &env.clock,
            &mut env.bus,
        );
        if i < 9 {
            assert_eq!(env.controller.remaining_seconds(), 15);
        }
    }
    assert_eq!(env.controller.remaining_seconds(), 14);
}
