//! Simulation session
//!
//! The one owner of all mutable simulation state: the phase controller,
//! flow accumulator, generation strategy, live agents and the event bus.
//! Everything advances from `tick`, in a fixed order each call: signals
//! first, then light-change routing, then spawning, then agent updates.
//! There are no ambient singletons; components receive what they need by
//! reference.

use std::collections::HashMap;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::clock::{Clock, SystemClock};
use super::config::{ScenarioPreset, SimConfig};
use super::events::{EventBus, SimEvent};
use super::flow::{FlowAccumulator, FlowSnapshot};
use super::generator::{DirectionCensus, GenerationStats, GenerationStrategy, SpawnRequest};
use super::geometry::IntersectionGeometry;
use super::phase::PhaseController;
use super::prediction::{NoPrediction, PredictionService};
use super::types::{Direction, LightState, VehicleId, ALL_DIRECTIONS};
use super::vehicle::{AgentStatus, AgentView, VehicleAgent};

/// Spawn is refused when another vehicle sits this close to the lane start
const SPAWN_CLEARANCE: f32 = 60.0;

pub struct SimSession {
    config: SimConfig,
    geometry: IntersectionGeometry,
    bus: EventBus,
    clock: Box<dyn Clock>,
    prediction: Box<dyn PredictionService>,
    controller: PhaseController,
    flow: FlowAccumulator,
    generator: GenerationStrategy,
    agents: HashMap<VehicleId, VehicleAgent>,
    rng: StdRng,
    next_id: usize,
    sim_time: f32,
    completed_count: u64,
}

impl SimSession {
    pub fn new(config: SimConfig) -> Self {
        Self::build(config, StdRng::from_os_rng())
    }

    /// Deterministic session for tests and reproducible runs
    pub fn with_seed(config: SimConfig, seed: u64) -> Self {
        Self::build(config, StdRng::seed_from_u64(seed))
    }

    fn build(config: SimConfig, rng: StdRng) -> Self {
        let geometry = IntersectionGeometry::standard();
        let flow = FlowAccumulator::new(config.flow, config.speeds);
        let controller = PhaseController::new(config.phase);
        let generator = GenerationStrategy::new(config.generation.clone(), config.speeds);
        Self {
            config,
            geometry,
            bus: EventBus::new(),
            clock: Box::new(SystemClock),
            prediction: Box::new(NoPrediction::default()),
            controller,
            flow,
            generator,
            agents: HashMap::new(),
            rng,
            next_id: 0,
            sim_time: 0.0,
            completed_count: 0,
        }
    }

    /// Replace the wall clock, for tests that pin the time of day
    pub fn set_clock(&mut self, clock: impl Clock + 'static) {
        self.clock = Box::new(clock);
    }

    /// Attach a prediction backend; without one every cycle uses the local
    /// fallback timing
    pub fn set_prediction_service(&mut self, service: impl PredictionService + 'static) {
        self.prediction = Box::new(service);
    }

    /// Register a passive observer of all simulation events
    pub fn subscribe(&mut self, sink: impl FnMut(&SimEvent) + 'static) {
        self.bus.subscribe(sink);
    }

    pub fn start(&mut self) {
        info!("starting simulation session");
        self.controller.start(&mut self.bus);
        self.generator.start(self.sim_time);
    }

    pub fn stop(&mut self) {
        self.controller.stop();
        self.generator.stop(self.sim_time);
        info!("simulation session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn light_state(&self, direction: Direction) -> LightState {
        self.controller.light_state(direction)
    }

    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    pub fn live_vehicle_count(&self) -> usize {
        self.agents.len()
    }

    pub fn completed_count(&self) -> u64 {
        self.completed_count
    }

    pub fn generation_stats(&self) -> &GenerationStats {
        self.generator.stats()
    }

    pub fn flow_snapshot(&self) -> FlowSnapshot {
        self.flow.snapshot(self.sim_time)
    }

    /// Pre-load one approach with a demo preset's vehicle counts. The
    /// seeded load shapes the first prediction request and fallback, then
    /// washes out at the next phase boundary.
    pub fn apply_scenario(&mut self, direction: Direction, preset: ScenarioPreset) {
        info!("applying {preset:?} scenario to the {direction} approach");
        self.flow.seed_preset(direction, preset);
    }

    pub fn geometry(&self) -> &IntersectionGeometry {
        &self.geometry
    }

    /// Iterate over live agents, in no particular order
    pub fn agents(&self) -> impl Iterator<Item = &VehicleAgent> {
        self.agents.values()
    }

    /// Advance the whole simulation by `delta` seconds. Returns every event
    /// produced during the tick, in publish order.
    pub fn tick(&mut self, delta: f32) -> Vec<SimEvent> {
        self.sim_time += delta;
        let now = self.sim_time;

        self.controller.tick(
            delta,
            now,
            &mut self.flow,
            self.prediction.as_mut(),
            self.clock.as_ref(),
            &mut self.bus,
        );

        // Route light changes to queued agents before they update, so a
        // flip and the reaction to it land in the same tick.
        let mut events = self.bus.drain();
        for event in &events {
            if let SimEvent::LightStateChanged { direction, state } = event {
                for agent in self.agents.values_mut() {
                    if agent.direction() == *direction {
                        agent.notify_light_change(*state, now, &mut self.rng);
                    }
                }
            }
        }

        let census = self.build_census();
        let time = self.clock.now();
        if let Some(request) = self.generator.tick(now, &census, time, &mut self.rng) {
            if let Err(err) = self.spawn_vehicle(request) {
                warn!("spawn failed: {err:#}");
            }
        }

        self.update_agents(delta, now);

        events.extend(self.bus.drain());
        events
    }

    fn build_census(&self) -> [DirectionCensus; 4] {
        let mut census = ALL_DIRECTIONS.map(|direction| DirectionCensus {
            direction,
            live: 0,
            queued: 0,
            light: self.controller.light_state(direction),
        });
        for agent in self.agents.values() {
            if let Some(slot) = census
                .iter_mut()
                .find(|c| c.direction == agent.direction())
            {
                slot.live += 1;
                if agent.is_waiting() {
                    slot.queued += 1;
                }
            }
        }
        census
    }

    /// Place a new agent on the least obstructed lane of the requested
    /// approach. Refuses rather than stacking vehicles on top of each other.
    fn spawn_vehicle(&mut self, request: SpawnRequest) -> Result<()> {
        let SpawnRequest {
            direction,
            vehicle_type,
            speed,
        } = request;

        let mut lanes: Vec<usize> = (0..self.geometry.lane_count(direction)).collect();
        lanes.shuffle(&mut self.rng);
        let lane = lanes
            .into_iter()
            .find(|&lane| self.lane_start_clear(direction, lane))
            .context("every lane start is blocked")?;

        let id = VehicleId(self.next_id);
        self.next_id += 1;
        let agent = VehicleAgent::spawn(
            id,
            direction,
            lane,
            vehicle_type,
            speed,
            &self.geometry,
            self.sim_time,
        )
        .with_context(|| format!("spawning {vehicle_type} on the {direction} approach"))?;

        self.flow.record_entry(direction, vehicle_type, speed);
        self.bus.publish(SimEvent::VehicleAdded {
            direction,
            vehicle_type,
            speed,
            vehicle_id: id,
            timestamp: self.sim_time,
        });
        debug!("{id} added: {vehicle_type} {direction} lane {lane} at {speed:.0} km/h");
        self.agents.insert(id, agent);
        Ok(())
    }

    fn lane_start_clear(&self, direction: Direction, lane: usize) -> bool {
        let Some(start) = self.geometry.lane_start(direction, lane) else {
            return false;
        };
        self.agents.values().all(|agent| {
            agent.direction() != direction
                || agent.lane() != lane
                || agent.position().distance(&start) > SPAWN_CLEARANCE
        })
    }

    /// Update every agent against a snapshot of this tick's views. The
    /// snapshot is stale: an agent completed earlier in the
    /// loop still appears in it and stops mattering next tick.
    fn update_agents(&mut self, delta: f32, now: f32) {
        let views: Vec<AgentView> = self.agents.values().map(VehicleAgent::view).collect();
        let ids: Vec<VehicleId> = self.agents.keys().copied().collect();

        for id in ids {
            let Some(mut agent) = self.agents.remove(&id) else {
                continue;
            };
            let light = self.controller.light_state(agent.direction());
            let status = agent.update(
                delta,
                now,
                light,
                &views,
                &self.geometry,
                &self.config.collision,
                &mut self.rng,
            );
            match status {
                AgentStatus::Active => {
                    self.agents.insert(id, agent);
                }
                AgentStatus::Completed => {
                    self.completed_count += 1;
                    self.flow.record_exit(agent.direction(), agent.vehicle_type());
                    self.bus.publish(SimEvent::VehicleRemoved {
                        direction: agent.direction(),
                        vehicle_type: agent.vehicle_type(),
                        vehicle_id: id,
                        final_speed: agent.current_speed(),
                        travel_time: now - agent.spawned_at(),
                    });
                }
            }
        }
    }

    /// Log a one-shot summary of the session state
    pub fn log_summary(&self) {
        let stats = self.generator.stats();
        info!(
            "t={:.1}s, live {}, completed {}, spawned {} ({:.1}/min)",
            self.sim_time,
            self.agents.len(),
            self.completed_count,
            stats.total,
            stats.rate_per_minute(self.sim_time)
        );
        for (direction, state) in self.controller.light_states() {
            info!(
                "  {direction}: {state}, {} live, occupancy {:.0}%",
                self.flow.live_count(direction),
                self.flow.occupancy(direction)
            );
        }
    }
}
