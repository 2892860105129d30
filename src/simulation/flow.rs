//! Flow accumulation per phase window
//!
//! Counts vehicle entries and exits per (direction, type) within the
//! current phase window and derives the occupancy and speed figures the
//! prediction request is built from. The accumulator is reset at every
//! phase boundary.

use log::warn;

use super::config::{FlowConfig, ScenarioPreset, SpeedConfig};
use super::types::{Direction, VehicleType, ALL_DIRECTIONS, ALL_VEHICLE_TYPES};

fn dir_idx(direction: Direction) -> usize {
    match direction {
        Direction::East => 0,
        Direction::West => 1,
        Direction::South => 2,
        Direction::North => 3,
    }
}

fn type_idx(vehicle_type: VehicleType) -> usize {
    match vehicle_type {
        VehicleType::Motor => 0,
        VehicleType::Small => 1,
        VehicleType::Large => 2,
    }
}

/// Per-direction slice of a flow snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectionFlow {
    pub motor: u32,
    pub small: u32,
    pub large: u32,
    /// Type-weighted average speed adjusted for occupancy slowdown, km/h
    pub average_speed: f32,
    /// Occupancy-adjusted speeds per type: (motor, small, large), km/h
    pub speed_by_type: (f32, f32, f32),
    /// Mean of the speeds recorded on entry, km/h
    pub observed_speed: f32,
    /// Percentage of configured capacity consumed, clamped to [0, 100]
    pub occupancy: f32,
}

impl DirectionFlow {
    pub fn total(&self) -> u32 {
        self.motor + self.small + self.large
    }

    pub fn count(&self, vehicle_type: VehicleType) -> u32 {
        match vehicle_type {
            VehicleType::Motor => self.motor,
            VehicleType::Small => self.small,
            VehicleType::Large => self.large,
        }
    }
}

/// Non-destructive snapshot of the current phase window
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub window_start: f32,
    pub window_end: f32,
    flows: [DirectionFlow; 4],
}

impl FlowSnapshot {
    pub fn direction(&self, direction: Direction) -> &DirectionFlow {
        &self.flows[dir_idx(direction)]
    }

    /// Total entries across both directions of an axis
    pub fn axis_total(&self, axis: super::types::Axis) -> u32 {
        axis.directions()
            .iter()
            .map(|d| self.direction(*d).total())
            .sum()
    }

    pub fn grand_total(&self) -> u32 {
        self.flows.iter().map(|f| f.total()).sum()
    }
}

/// Accumulates vehicle entries/exits within the current phase window
#[derive(Debug, Clone)]
pub struct FlowAccumulator {
    entries: [[u32; 3]; 4],
    exits: [[u32; 3]; 4],
    speed_sums: [f32; 4],
    window_start: f32,
    config: FlowConfig,
    speeds: SpeedConfig,
}

impl FlowAccumulator {
    pub fn new(config: FlowConfig, speeds: SpeedConfig) -> Self {
        Self {
            entries: [[0; 3]; 4],
            exits: [[0; 3]; 4],
            speed_sums: [0.0; 4],
            window_start: 0.0,
            config,
            speeds,
        }
    }

    /// Record a vehicle entering the scene
    pub fn record_entry(&mut self, direction: Direction, vehicle_type: VehicleType, speed: f32) {
        self.entries[dir_idx(direction)][type_idx(vehicle_type)] += 1;
        self.speed_sums[dir_idx(direction)] += speed;
    }

    /// Record a vehicle leaving the scene. An exit with no matching entry in
    /// the current window is logged and ignored; counts never go negative.
    pub fn record_exit(&mut self, direction: Direction, vehicle_type: VehicleType) {
        let d = dir_idx(direction);
        let t = type_idx(vehicle_type);
        if self.exits[d][t] >= self.entries[d][t] {
            warn!(
                "flow exit without matching entry: {} {}, ignoring",
                direction, vehicle_type
            );
            return;
        }
        self.exits[d][t] += 1;
    }

    /// Pre-load one approach with a preset's vehicle counts. Seeded
    /// vehicles enter at their type's average speed and count toward
    /// occupancy until the window resets.
    pub fn seed_preset(&mut self, direction: Direction, preset: ScenarioPreset) {
        let (motor, small, large) = preset.counts();
        for (vehicle_type, count) in [
            (VehicleType::Motor, motor),
            (VehicleType::Small, small),
            (VehicleType::Large, large),
        ] {
            let speed = self.speeds.range(vehicle_type).average();
            for _ in 0..count {
                self.record_entry(direction, vehicle_type, speed);
            }
        }
    }

    /// Count of vehicles counted in but not yet out for one direction
    pub fn live_count(&self, direction: Direction) -> u32 {
        let d = dir_idx(direction);
        (0..3)
            .map(|t| self.entries[d][t].saturating_sub(self.exits[d][t]))
            .sum()
    }

    /// Occupancy slowdown factor from the original speed model
    fn slowdown_factor(occupancy: f32) -> f32 {
        if occupancy > 80.0 {
            0.4
        } else if occupancy > 60.0 {
            0.6
        } else if occupancy > 30.0 {
            0.8
        } else {
            0.9
        }
    }

    /// Occupancy of one direction as a percentage, clamped to [0, 100]
    pub fn occupancy(&self, direction: Direction) -> f32 {
        let capacity = self.config.capacity_per_direction.max(1) as f32;
        (self.live_count(direction) as f32 / capacity * 100.0).clamp(0.0, 100.0)
    }

    /// Occupancy-adjusted average speed for one (direction, type)
    pub fn adjusted_speed(&self, direction: Direction, vehicle_type: VehicleType) -> f32 {
        let base = self.speeds.range(vehicle_type).average();
        (base * Self::slowdown_factor(self.occupancy(direction))).round()
    }

    /// Pure snapshot of the window so far; does not modify any count
    pub fn snapshot(&self, now: f32) -> FlowSnapshot {
        let mut flows = [DirectionFlow::default(); 4];
        for direction in ALL_DIRECTIONS {
            let d = dir_idx(direction);
            let flow = &mut flows[d];
            flow.motor = self.entries[d][type_idx(VehicleType::Motor)];
            flow.small = self.entries[d][type_idx(VehicleType::Small)];
            flow.large = self.entries[d][type_idx(VehicleType::Large)];
            flow.occupancy = self.occupancy(direction);
            flow.speed_by_type = (
                self.adjusted_speed(direction, VehicleType::Motor),
                self.adjusted_speed(direction, VehicleType::Small),
                self.adjusted_speed(direction, VehicleType::Large),
            );

            let total = flow.total();
            if total > 0 {
                let weighted: f32 = ALL_VEHICLE_TYPES
                    .iter()
                    .map(|&t| flow.count(t) as f32 * self.adjusted_speed(direction, t))
                    .sum();
                flow.average_speed = (weighted / total as f32).round();
                flow.observed_speed = (self.speed_sums[d] / total as f32).round();
            }
        }
        FlowSnapshot {
            window_start: self.window_start,
            window_end: now,
            flows,
        }
    }

    /// Clear all counts and start a fresh window at `now`
    pub fn reset(&mut self, now: f32) {
        self.entries = [[0; 3]; 4];
        self.exits = [[0; 3]; 4];
        self.speed_sums = [0.0; 4];
        self.window_start = now;
    }

    pub fn window_start(&self) -> f32 {
        self.window_start
    }
}
