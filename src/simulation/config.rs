//! Consolidated simulation configuration
//!
//! The source system scattered inconsistent copies of these constants across
//! several components; here they live in one documented place. Safety
//! distances and density thresholds are tunables, not contracts.

use super::types::VehicleType;

/// Speed range in km/h for one vehicle type
#[derive(Debug, Clone, Copy)]
pub struct SpeedRange {
    pub min: f32,
    pub max: f32,
}

impl SpeedRange {
    pub fn average(&self) -> f32 {
        ((self.min + self.max) / 2.0).round()
    }
}

/// Per-type speed configuration; the single source of truth for vehicle
/// speeds
#[derive(Debug, Clone, Copy)]
pub struct SpeedConfig {
    pub motor: SpeedRange,
    pub small: SpeedRange,
    pub large: SpeedRange,
}

impl SpeedConfig {
    pub fn range(&self, vehicle_type: VehicleType) -> SpeedRange {
        match vehicle_type {
            VehicleType::Motor => self.motor,
            VehicleType::Small => self.small,
            VehicleType::Large => self.large,
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            motor: SpeedRange { min: 40.0, max: 50.0 },
            small: SpeedRange { min: 30.0, max: 40.0 },
            large: SpeedRange { min: 20.0, max: 30.0 },
        }
    }
}

/// Forward-scan tuning for the vehicle collision state machine
#[derive(Debug, Clone, Copy)]
pub struct CollisionConfig {
    /// Gap below which a follower starts tracking the vehicle ahead
    pub safe_distance: f32,
    /// Gap below which the follower must stop outright
    pub stop_distance: f32,
    /// Gap that must be restored before a queued follower resumes
    pub resume_distance: f32,
    /// Relaxed distances for the first seconds after motion starts
    pub eased_safe_distance: f32,
    pub eased_stop_distance: f32,
    /// How long after motion start the eased distances apply (seconds)
    pub easing_window: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            safe_distance: 10.0,
            stop_distance: 5.0,
            resume_distance: 15.0,
            eased_safe_distance: 5.0,
            eased_stop_distance: 2.0,
            easing_window: 2.0,
        }
    }
}

/// Demo traffic levels with fixed per-type vehicle counts. Applying a
/// preset to an approach pre-loads the flow window as if that many
/// vehicles had already been counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioPreset {
    Smooth,
    Normal,
    Congested,
}

impl ScenarioPreset {
    /// Seeded counts as (motor, small, large)
    pub fn counts(&self) -> (u32, u32, u32) {
        match self {
            ScenarioPreset::Smooth => (2, 4, 1),
            ScenarioPreset::Normal => (5, 8, 3),
            ScenarioPreset::Congested => (10, 15, 6),
        }
    }
}

impl std::str::FromStr for ScenarioPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smooth" => Ok(ScenarioPreset::Smooth),
            "normal" => Ok(ScenarioPreset::Normal),
            "congested" => Ok(ScenarioPreset::Congested),
            other => anyhow::bail!("unknown scenario preset: {other}"),
        }
    }
}

/// Spawn interval bounds in seconds
#[derive(Debug, Clone, Copy)]
pub struct IntervalConfig {
    pub min: f32,
    pub normal: f32,
    pub max: f32,
    /// Interval once the scene exceeds the congested threshold; also the
    /// upper clamp on every computed interval
    pub overload: f32,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            min: 1.5,
            normal: 2.5,
            max: 4.0,
            overload: 8.0,
        }
    }
}

/// Live-vehicle census boundaries driving the adaptive spawn interval
#[derive(Debug, Clone, Copy)]
pub struct DensityThresholds {
    pub light: usize,
    pub moderate: usize,
    pub heavy: usize,
    pub congested: usize,
}

impl Default for DensityThresholds {
    fn default() -> Self {
        Self {
            light: 8,
            moderate: 16,
            heavy: 24,
            congested: 32,
        }
    }
}

/// Sampling weight for one vehicle type; weights are renormalized before
/// every draw, so they need not sum to anything in particular
#[derive(Debug, Clone, Copy)]
pub struct TypeWeight {
    pub vehicle_type: VehicleType,
    pub weight: f32,
}

/// Spawn-rate multipliers per time-of-day band; the computed interval is
/// divided by the active factor
#[derive(Debug, Clone, Copy)]
pub struct TimeFactors {
    pub rush: f32,
    pub normal: f32,
    pub off_peak: f32,
}

impl Default for TimeFactors {
    fn default() -> Self {
        Self {
            rush: 1.5,
            normal: 1.0,
            off_peak: 0.6,
        }
    }
}

/// Traffic-generation strategy configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub interval: IntervalConfig,
    pub density: DensityThresholds,
    pub type_weights: Vec<TypeWeight>,
    pub time_factors: TimeFactors,
    /// Divides the computed interval; >1 means denser traffic
    pub peak_multiplier: f32,
    /// Manual mode bypasses the density ladder and direction scoring:
    /// spawn every `interval.normal` seconds (jittered), uniform direction
    pub manual: bool,
    /// Hard cap on live vehicles across all approaches
    pub max_live_vehicles: usize,
    /// Refuse spawning into an approach with this many queued vehicles
    pub max_queue_per_direction: usize,
    /// Wait before retrying after a cap-skip (seconds)
    pub cap_retry_wait: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            interval: IntervalConfig::default(),
            density: DensityThresholds::default(),
            type_weights: vec![
                TypeWeight { vehicle_type: VehicleType::Motor, weight: 35.0 },
                TypeWeight { vehicle_type: VehicleType::Small, weight: 50.0 },
                TypeWeight { vehicle_type: VehicleType::Large, weight: 15.0 },
            ],
            time_factors: TimeFactors::default(),
            peak_multiplier: 1.0,
            manual: false,
            max_live_vehicles: 40,
            max_queue_per_direction: 8,
            cap_retry_wait: 1.0,
        }
    }
}

impl GenerationConfig {
    /// Manual-mode configuration: only the spawn interval is taken from the
    /// caller, everything else resets to defaults so no stale mixed state
    /// survives the mode switch.
    pub fn manual(interval_secs: f32) -> Self {
        Self {
            interval: IntervalConfig {
                normal: interval_secs,
                ..IntervalConfig::default()
            },
            manual: true,
            ..Self::default()
        }
    }
}

/// Phase-controller timing constants
#[derive(Debug, Clone, Copy)]
pub struct PhaseConfig {
    /// Initial green duration for both axes (seconds)
    pub initial_green: u32,
    /// Fixed yellow duration (seconds)
    pub yellow: u32,
    /// Remaining green seconds at which the prediction request fires
    pub prediction_threshold: u32,
    /// Clamp applied to every green duration, predicted or fallback
    pub min_green: u32,
    pub max_green: u32,
    /// Fallback heuristic: baseline seconds plus a linear term per vehicle
    /// of imbalance toward the axis being timed
    pub fallback_baseline: f32,
    pub fallback_per_vehicle: f32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            initial_green: 15,
            yellow: 2,
            prediction_threshold: 10,
            min_green: 8,
            max_green: 45,
            fallback_baseline: 15.0,
            fallback_per_vehicle: 0.5,
        }
    }
}

/// Flow-accumulator configuration
#[derive(Debug, Clone, Copy)]
pub struct FlowConfig {
    /// Estimated capacity per approach used for the occupancy percentage
    pub capacity_per_direction: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            capacity_per_direction: 20,
        }
    }
}

/// Top-level configuration object passed to the session
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    pub speeds: SpeedConfig,
    pub collision: CollisionConfig,
    pub generation: GenerationConfig,
    pub phase: PhaseConfig,
    pub flow: FlowConfig,
}
