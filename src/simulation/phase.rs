//! Two-phase signal controller
//!
//! Cycles the north-south and east-west axes through green (adaptive
//! duration) and yellow (fixed) stages. Near the end of each green it
//! snapshots the flow accumulator and submits a prediction request for the
//! next cycle's durations without blocking the countdown; if the service
//! fails or is still pending at the flip, a deterministic local heuristic
//! supplies the durations instead. A late response only ever lands in
//! `next_timing`, which is consumed at the following flip and never the
//! phase already underway.

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{debug, error, info, warn};

use super::clock::Clock;
use super::config::PhaseConfig;
use super::events::{EventBus, SimEvent};
use super::flow::FlowAccumulator;
use super::prediction::{build_request, PredictionPoll, PredictionService};
use super::types::{Axis, Direction, LightState, ALL_DIRECTIONS};

/// Green durations per axis, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisTiming {
    pub east_west: u32,
    pub north_south: u32,
}

impl AxisTiming {
    fn uniform(seconds: u32) -> Self {
        Self {
            east_west: seconds,
            north_south: seconds,
        }
    }

    pub fn get(&self, axis: Axis) -> u32 {
        match axis {
            Axis::EastWest => self.east_west,
            Axis::NorthSouth => self.north_south,
        }
    }

    fn set(&mut self, axis: Axis, seconds: u32) {
        match axis {
            Axis::EastWest => self.east_west = seconds,
            Axis::NorthSouth => self.north_south = seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Green { remaining: u32 },
    Yellow { remaining: u32 },
}

fn dir_idx(direction: Direction) -> usize {
    match direction {
        Direction::East => 0,
        Direction::West => 1,
        Direction::South => 2,
        Direction::North => 3,
    }
}

type CountdownCallback = Box<dyn FnMut(Axis, u32)>;

/// Owns the light state of all four directions and runs the phase cycle
pub struct PhaseController {
    lights: [LightState; 4],
    current_axis: Axis,
    dynamic_timing: AxisTiming,
    next_timing: AxisTiming,
    running: bool,
    stage: Stage,
    /// Accumulates tick deltas into whole countdown seconds
    second_accum: f32,
    /// Remaining error-recovery delay before the countdown resumes
    stall: f32,
    /// A request was submitted during the current green
    request_submitted: bool,
    /// A request is outstanding at the service; survives a flip so a late
    /// answer can still land in `next_timing`
    in_flight: bool,
    /// That request produced a usable response
    response_applied: bool,
    config: PhaseConfig,
    on_countdown: Option<CountdownCallback>,
}

impl PhaseController {
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            lights: [LightState::Red; 4],
            current_axis: Axis::NorthSouth,
            dynamic_timing: AxisTiming::uniform(config.initial_green),
            next_timing: AxisTiming::uniform(config.initial_green),
            running: false,
            stage: Stage::Green {
                remaining: config.initial_green,
            },
            second_accum: 0.0,
            stall: 0.0,
            request_submitted: false,
            in_flight: false,
            response_applied: false,
            config,
            on_countdown: None,
        }
    }

    /// Begin the cycle: north-south green, east-west red. Idempotent.
    pub fn start(&mut self, bus: &mut EventBus) {
        if self.running {
            warn!("phase controller already running");
            return;
        }
        info!(
            "starting phase controller: {} green for {}s",
            Axis::NorthSouth,
            self.dynamic_timing.north_south
        );
        self.running = true;
        self.current_axis = Axis::NorthSouth;
        self.stage = Stage::Green {
            remaining: self.dynamic_timing.north_south,
        };
        self.second_accum = 0.0;
        self.request_submitted = false;
        self.in_flight = false;
        for direction in Axis::NorthSouth.directions() {
            self.set_light_state(direction, LightState::Green, bus);
        }
        for direction in Axis::EastWest.directions() {
            self.set_light_state(direction, LightState::Red, bus);
        }
        bus.publish(SimEvent::GreenLightStarted {
            axis: Axis::NorthSouth,
        });
    }

    /// Halt after the current tick. Pending countdown state is discarded;
    /// calling `stop` twice is harmless.
    pub fn stop(&mut self) {
        if self.running {
            info!("stopping phase controller");
        }
        self.running = false;
        self.second_accum = 0.0;
        self.stall = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// O(1) read of one direction's light
    pub fn light_state(&self, direction: Direction) -> LightState {
        self.lights[dir_idx(direction)]
    }

    /// Mutate one direction's light and announce the change
    pub fn set_light_state(
        &mut self,
        direction: Direction,
        state: LightState,
        bus: &mut EventBus,
    ) {
        self.lights[dir_idx(direction)] = state;
        bus.publish(SimEvent::LightStateChanged { direction, state });
    }

    pub fn current_axis(&self) -> Axis {
        self.current_axis
    }

    /// Seconds left in the current stage
    pub fn remaining_seconds(&self) -> u32 {
        match self.stage {
            Stage::Green { remaining } | Stage::Yellow { remaining } => remaining,
        }
    }

    pub fn dynamic_timing(&self) -> AxisTiming {
        self.dynamic_timing
    }

    pub fn next_timing(&self) -> AxisTiming {
        self.next_timing
    }

    /// Register the per-second countdown observer
    pub fn set_countdown_callback(&mut self, callback: impl FnMut(Axis, u32) + 'static) {
        self.on_countdown = Some(Box::new(callback));
    }

    fn clamp_green(&self, seconds: u32) -> u32 {
        seconds.clamp(self.config.min_green, self.config.max_green)
    }

    /// Deterministic local heuristic: baseline plus a linear term per
    /// vehicle of the axis's share above an even split, clamped.
    pub fn fallback_duration(&self, axis_count: u32, total_count: u32) -> u32 {
        let balanced = total_count as f32 / 2.0;
        let surplus = (axis_count as f32 - balanced).max(0.0);
        let raw = self.config.fallback_baseline + self.config.fallback_per_vehicle * surplus;
        self.clamp_green(raw.round() as u32)
    }

    /// Advance the controller. The countdown ticks once per accumulated
    /// second; the prediction service is polled every call so responses
    /// land as soon as they are available.
    pub fn tick(
        &mut self,
        delta: f32,
        now: f32,
        flow: &mut FlowAccumulator,
        service: &mut dyn PredictionService,
        clock: &dyn Clock,
        bus: &mut EventBus,
    ) {
        if !self.running {
            return;
        }

        self.poll_service(service, bus);

        if self.stall > 0.0 {
            self.stall -= delta;
            if self.stall > 0.0 {
                return;
            }
            self.stall = 0.0;
            info!("phase cycle resuming after error delay");
        }

        self.second_accum += delta;
        while self.second_accum >= 1.0 {
            self.second_accum -= 1.0;
            self.second_tick(now, flow, service, clock, bus);
            if !self.running {
                break;
            }
        }
    }

    fn poll_service(&mut self, service: &mut dyn PredictionService, bus: &mut EventBus) {
        if !self.in_flight {
            return;
        }
        let poll = match catch_unwind(AssertUnwindSafe(|| service.poll())) {
            Ok(poll) => poll,
            Err(_) => {
                error!("prediction service panicked during poll; resuming in 1s");
                self.stall = 1.0;
                PredictionPoll::Failed("prediction service panicked".into())
            }
        };
        match poll {
            PredictionPoll::Ready(response) => {
                let east_west = self.clamp_green(response.east_west_seconds);
                let north_south = self.clamp_green(response.south_north_seconds);
                self.next_timing.set(Axis::EastWest, east_west);
                self.next_timing.set(Axis::NorthSouth, north_south);
                self.in_flight = false;
                self.response_applied = true;
                info!(
                    "next green durations predicted: east-west {}s, north-south {}s",
                    east_west, north_south
                );
            }
            PredictionPoll::Failed(reason) => {
                warn!("prediction request failed: {reason}");
                self.in_flight = false;
                bus.publish(SimEvent::PredictionDegraded { detail: reason });
            }
            PredictionPoll::Idle => {
                // The service lost track of the request; stop waiting on it.
                debug!("prediction service went idle with a request outstanding");
                self.in_flight = false;
            }
            PredictionPoll::Pending => {}
        }
    }

    fn second_tick(
        &mut self,
        now: f32,
        flow: &mut FlowAccumulator,
        service: &mut dyn PredictionService,
        clock: &dyn Clock,
        bus: &mut EventBus,
    ) {
        match self.stage {
            Stage::Green { remaining } => {
                let remaining = remaining.saturating_sub(1);
                self.stage = Stage::Green { remaining };
                if let Some(callback) = self.on_countdown.as_mut() {
                    callback(self.current_axis, remaining);
                }

                // Short greens can start below the threshold, so <= rather
                // than an exact match keeps the request from being skipped.
                if !self.request_submitted && remaining <= self.config.prediction_threshold {
                    self.submit_request(now, flow, service, clock);
                }

                if remaining == 0 {
                    debug!("{} green ended, switching to yellow", self.current_axis);
                    for direction in self.current_axis.directions() {
                        self.set_light_state(direction, LightState::Yellow, bus);
                    }
                    bus.publish(SimEvent::GreenLightEnded {
                        axis: self.current_axis,
                    });
                    self.stage = Stage::Yellow {
                        remaining: self.config.yellow,
                    };
                }
            }
            Stage::Yellow { remaining } => {
                let remaining = remaining.saturating_sub(1);
                self.stage = Stage::Yellow { remaining };
                if let Some(callback) = self.on_countdown.as_mut() {
                    callback(self.current_axis, remaining);
                }
                if remaining == 0 {
                    self.flip(now, flow, bus);
                }
            }
        }
    }

    fn submit_request(
        &mut self,
        now: f32,
        flow: &FlowAccumulator,
        service: &mut dyn PredictionService,
        clock: &dyn Clock,
    ) {
        let snapshot = flow.snapshot(now);
        let records = build_request(&snapshot, clock.now());
        debug!(
            "requesting adaptive durations ({} vehicles this window)",
            snapshot.grand_total()
        );
        if catch_unwind(AssertUnwindSafe(|| service.submit(records))).is_err() {
            error!("prediction service panicked during submit; resuming in 1s");
            self.stall = 1.0;
        } else {
            self.in_flight = true;
        }
        self.request_submitted = true;
        self.response_applied = false;
    }

    /// End of yellow: swap axes, apply the pre-fetched timing for the new
    /// phase and open a fresh flow window.
    fn flip(&mut self, now: f32, flow: &mut FlowAccumulator, bus: &mut EventBus) {
        if self.request_submitted && !self.response_applied {
            // No usable response this cycle: deterministic local fallback.
            let snapshot = flow.snapshot(now);
            let total = snapshot.grand_total();
            let east_west = self.fallback_duration(snapshot.axis_total(Axis::EastWest), total);
            let north_south =
                self.fallback_duration(snapshot.axis_total(Axis::NorthSouth), total);
            self.next_timing.set(Axis::EastWest, east_west);
            self.next_timing.set(Axis::NorthSouth, north_south);
            warn!(
                "applying fallback green durations: east-west {}s, north-south {}s",
                east_west, north_south
            );
        }

        let old_axis = self.current_axis;
        let new_axis = old_axis.opposite();
        for direction in old_axis.directions() {
            self.set_light_state(direction, LightState::Red, bus);
        }
        for direction in new_axis.directions() {
            self.set_light_state(direction, LightState::Green, bus);
        }
        self.current_axis = new_axis;
        self.dynamic_timing
            .set(new_axis, self.next_timing.get(new_axis));
        self.stage = Stage::Green {
            remaining: self.dynamic_timing.get(new_axis),
        };
        // An outstanding request keeps being polled across the flip; its
        // late answer lands in `next_timing` for the following cycle.
        self.request_submitted = false;
        self.response_applied = false;

        flow.reset(now);
        bus.publish(SimEvent::GreenLightStarted { axis: new_axis });
        bus.publish(SimEvent::TrafficCycleReset {
            timestamp: now,
            reason: "phase switch",
        });
        info!(
            "phase switched to {} for {}s",
            new_axis,
            self.dynamic_timing.get(new_axis)
        );
    }

    /// Debug view of all four lights
    pub fn light_states(&self) -> [(Direction, LightState); 4] {
        let mut states = [(Direction::East, LightState::Red); 4];
        for (slot, direction) in states.iter_mut().zip(ALL_DIRECTIONS) {
            *slot = (direction, self.light_state(direction));
        }
        states
    }
}
