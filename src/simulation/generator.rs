//! Adaptive traffic generation
//!
//! Spawns are scheduled as simulation-time deadlines. Each successful spawn
//! computes the next deadline from a density ladder: the busier the scene,
//! the longer the wait. Direction choice scores every approach on density,
//! light state and queue length and usually picks the best, occasionally
//! the runner-up, so the load never locks onto one approach. Vehicle types
//! are drawn from a weight table scaled by time of day.

use log::{debug, info, trace};
use ordered_float::OrderedFloat;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::clock::TimeOfDay;
use super::config::{GenerationConfig, SpeedConfig};
use super::types::{Direction, LightState, VehicleType, ALL_DIRECTIONS, ALL_VEHICLE_TYPES};

/// Per-approach inputs to direction scoring, built fresh each tick
#[derive(Debug, Clone, Copy)]
pub struct DirectionCensus {
    pub direction: Direction,
    /// Live vehicles on this approach
    pub live: usize,
    /// Vehicles currently stopped on this approach
    pub queued: usize,
    pub light: LightState,
}

/// One spawn the strategy has decided on; the session executes it
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest {
    pub direction: Direction,
    pub vehicle_type: VehicleType,
    /// Assigned cruise speed in km/h
    pub speed: f32,
}

/// Running totals since `start`
#[derive(Debug, Clone, Default)]
pub struct GenerationStats {
    pub total: u64,
    by_direction: [u64; 4],
    by_type: [u64; 3],
    started_at: f32,
}

impl GenerationStats {
    pub fn by_direction(&self, direction: Direction) -> u64 {
        self.by_direction[direction_slot(direction)]
    }

    pub fn by_type(&self, vehicle_type: VehicleType) -> u64 {
        self.by_type[type_slot(vehicle_type)]
    }

    pub fn rate_per_minute(&self, now: f32) -> f32 {
        let elapsed = now - self.started_at;
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.total as f32 / (elapsed / 60.0)
    }
}

fn direction_slot(direction: Direction) -> usize {
    match direction {
        Direction::East => 0,
        Direction::West => 1,
        Direction::South => 2,
        Direction::North => 3,
    }
}

fn type_slot(vehicle_type: VehicleType) -> usize {
    match vehicle_type {
        VehicleType::Motor => 0,
        VehicleType::Small => 1,
        VehicleType::Large => 2,
    }
}

pub struct GenerationStrategy {
    config: GenerationConfig,
    speeds: SpeedConfig,
    running: bool,
    next_spawn_at: f32,
    stats: GenerationStats,
}

impl GenerationStrategy {
    pub fn new(config: GenerationConfig, speeds: SpeedConfig) -> Self {
        Self {
            config,
            speeds,
            running: false,
            next_spawn_at: 0.0,
            stats: GenerationStats::default(),
        }
    }

    /// Begin scheduling spawns. Idempotent.
    pub fn start(&mut self, now: f32) {
        if self.running {
            return;
        }
        info!(
            "starting traffic generation ({} mode)",
            if self.config.manual { "manual" } else { "adaptive" }
        );
        self.running = true;
        self.next_spawn_at = now;
        self.stats = GenerationStats {
            started_at: now,
            ..GenerationStats::default()
        };
    }

    /// Stop scheduling and log the run's final statistics.
    pub fn stop(&mut self, now: f32) {
        if self.running {
            info!(
                "stopping traffic generation: {} spawned ({} motor / {} small / {} large), {:.1}/min",
                self.stats.total,
                self.stats.by_type(VehicleType::Motor),
                self.stats.by_type(VehicleType::Small),
                self.stats.by_type(VehicleType::Large),
                self.stats.rate_per_minute(now),
            );
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Produce at most one spawn decision per call. Returns `None` while the
    /// deadline has not arrived or a cap forced a skip.
    pub fn tick(
        &mut self,
        now: f32,
        census: &[DirectionCensus; 4],
        time: TimeOfDay,
        rng: &mut StdRng,
    ) -> Option<SpawnRequest> {
        if !self.running || now < self.next_spawn_at {
            return None;
        }

        let total_live: usize = census.iter().map(|c| c.live).sum();
        if total_live >= self.config.max_live_vehicles {
            debug!(
                "live-vehicle cap reached ({total_live}), retrying in {}s",
                self.config.cap_retry_wait
            );
            self.next_spawn_at = now + self.config.cap_retry_wait;
            return None;
        }

        let direction = if self.config.manual {
            *ALL_DIRECTIONS
                .choose(rng)
                .unwrap_or(&Direction::East)
        } else {
            match self.select_direction(census, rng) {
                Some(direction) => direction,
                None => {
                    debug!("all approaches at queue cap, retrying");
                    self.next_spawn_at = now + self.config.cap_retry_wait;
                    return None;
                }
            }
        };

        let vehicle_type = self.select_type(time, rng);
        let range = self.speeds.range(vehicle_type);
        let speed = rng.random_range(range.min..=range.max);

        self.stats.total += 1;
        self.stats.by_direction[direction_slot(direction)] += 1;
        self.stats.by_type[type_slot(vehicle_type)] += 1;

        let interval = if self.config.manual {
            self.manual_interval(rng)
        } else {
            self.adaptive_interval(total_live, time, rng)
        };
        self.next_spawn_at = now + interval;
        trace!("spawning {vehicle_type} {direction}, next spawn in {interval:.2}s");

        Some(SpawnRequest {
            direction,
            vehicle_type,
            speed,
        })
    }

    /// Lowest-score approach wins; red lights, long queues and density all
    /// raise the score. 70% of the time the best approach is used, 30% the
    /// runner-up, so one empty approach does not absorb every spawn.
    fn select_direction(
        &self,
        census: &[DirectionCensus; 4],
        rng: &mut StdRng,
    ) -> Option<Direction> {
        let mut scored: Vec<(Direction, f32)> = census
            .iter()
            .filter(|c| c.queued < self.config.max_queue_per_direction)
            .map(|c| {
                let mut score = c.live as f32 * 10.0;
                score += match c.light {
                    LightState::Red => 50.0,
                    LightState::Yellow => 20.0,
                    LightState::Green => 0.0,
                };
                score += c.queued as f32 * 5.0;
                (c.direction, score)
            })
            .collect();
        if scored.is_empty() {
            return None;
        }
        scored.sort_by_key(|(_, score)| OrderedFloat(*score));
        let index = if rng.random_bool(0.7) { 0 } else { 1 };
        let (direction, _) = scored[index.min(scored.len() - 1)];
        Some(direction)
    }

    /// Weighted draw over vehicle types, with the weight table scaled by the
    /// time of day before renormalization.
    fn select_type(&self, time: TimeOfDay, rng: &mut StdRng) -> VehicleType {
        let mut weights = [0.0_f32; 3];
        for entry in &self.config.type_weights {
            weights[type_slot(entry.vehicle_type)] += entry.weight;
        }
        match time.hour {
            7..=9 => {
                // Morning rush: commuters on two wheels and in small cars.
                weights[type_slot(VehicleType::Small)] *= 1.3;
                weights[type_slot(VehicleType::Motor)] *= 1.2;
                weights[type_slot(VehicleType::Large)] *= 0.6;
            }
            17..=19 => {
                weights[type_slot(VehicleType::Small)] *= 1.4;
                weights[type_slot(VehicleType::Large)] *= 0.7;
            }
            10..=16 => {
                // Daytime freight.
                weights[type_slot(VehicleType::Large)] *= 1.5;
            }
            _ => {}
        }
        match WeightedIndex::new(weights) {
            Ok(dist) => ALL_VEHICLE_TYPES[dist.sample(rng)],
            // Degenerate weight table: fall back to a uniform draw.
            Err(_) => *ALL_VEHICLE_TYPES.choose(rng).unwrap_or(&VehicleType::Small),
        }
    }

    /// Density ladder: the fuller the scene, the longer the wait. The ladder
    /// output is divided by the time factor and the peak multiplier, then
    /// jittered by plus or minus 20%.
    fn adaptive_interval(&self, total_live: usize, time: TimeOfDay, rng: &mut StdRng) -> f32 {
        let interval = &self.config.interval;
        let density = &self.config.density;
        let base = if total_live <= density.light {
            interval.min * 0.8
        } else if total_live <= density.moderate {
            interval.normal
        } else if total_live <= density.heavy {
            interval.normal * 1.5
        } else if total_live <= density.congested {
            interval.max
        } else {
            interval.overload
        };

        let factor = if time.is_peak_hour() {
            self.config.time_factors.rush
        } else if time.is_off_peak() {
            self.config.time_factors.off_peak
        } else {
            self.config.time_factors.normal
        };

        let adjusted = base / (factor * self.config.peak_multiplier.max(0.01));
        let jittered = adjusted * rng.random_range(0.8..1.2);
        jittered.clamp(interval.min, interval.overload)
    }

    /// Manual mode ignores density entirely
    fn manual_interval(&self, rng: &mut StdRng) -> f32 {
        self.config.interval.normal * rng.random_range(0.8..1.2)
    }
}
