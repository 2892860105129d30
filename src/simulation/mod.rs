//! Intersection simulation core
//!
//! All simulation logic lives here and runs headless: a session object owns
//! the signal controller, the traffic generator, the flow accumulator and
//! every live vehicle agent, and advances them from a single tick call.

mod clock;
mod config;
mod events;
mod flow;
mod generator;
mod geometry;
mod phase;
mod prediction;
mod timeline;
mod types;
mod vehicle;

pub mod session;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use clock::{Clock, FixedClock, SystemClock, TimeOfDay};
#[allow(unused_imports)]
pub use config::{
    CollisionConfig, DensityThresholds, FlowConfig, GenerationConfig, IntervalConfig, PhaseConfig,
    ScenarioPreset, SimConfig, SpeedConfig, SpeedRange, TimeFactors, TypeWeight,
};
#[allow(unused_imports)]
pub use events::{EventBus, SimEvent};
#[allow(unused_imports)]
pub use flow::{DirectionFlow, FlowAccumulator, FlowSnapshot};
#[allow(unused_imports)]
pub use generator::{DirectionCensus, GenerationStats, GenerationStrategy, SpawnRequest};
#[allow(unused_imports)]
pub use geometry::{Bounds, CentralBox, IntersectionGeometry};
#[allow(unused_imports)]
pub use phase::{AxisTiming, PhaseController};
#[allow(unused_imports)]
pub use prediction::{
    build_request, ApproachRecord, NoPrediction, PredictionPoll, PredictionResponse,
    PredictionService,
};
#[allow(unused_imports)]
pub use timeline::MotionTimeline;
#[allow(unused_imports)]
pub use types::{
    Axis, BoundingBox, Direction, LightState, Point, VehicleId, VehicleType, ALL_DIRECTIONS,
    ALL_VEHICLE_TYPES,
};
#[allow(unused_imports)]
pub use vehicle::{AgentStatus, AgentView, VehicleAgent, VehicleState};

pub use session::SimSession;
