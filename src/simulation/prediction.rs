//! Adaptive green-duration prediction contract
//!
//! The phase controller submits one record per approach and later polls for
//! the predicted green durations. The cooperative scheduling model means a
//! service answers across ticks rather than blocking the countdown; a
//! service that can answer immediately simply returns `Ready` on the first
//! poll. Transport is out of scope; implementations may wrap anything.

use super::clock::TimeOfDay;
use super::flow::FlowSnapshot;
use super::types::{Direction, VehicleType, ALL_DIRECTIONS};

/// One per-approach measurement record submitted to the service
#[derive(Debug, Clone, PartialEq)]
pub struct ApproachRecord {
    /// Detector-style identifier for the approach
    pub id: String,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub is_peak_hour: bool,
    pub lane_id: u32,
    pub lane_type: u32,
    /// Overall occupancy-adjusted average speed, km/h
    pub speed: f32,
    /// Occupancy percentage in [0, 100]
    pub occupancy: f32,
    /// Entry counts per type: (motor, small, large)
    pub volume_by_type: (u32, u32, u32),
    /// Adjusted speeds per type: (motor, small, large)
    pub speed_by_type: (f32, f32, f32),
}

/// Predicted green durations, in whole seconds. The controller clamps both
/// values regardless of what the service returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionResponse {
    pub east_west_seconds: u32,
    pub south_north_seconds: u32,
}

/// Result of polling an in-flight prediction request
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionPoll {
    /// No request in flight
    Idle,
    /// Request submitted, answer not available yet
    Pending,
    Ready(PredictionResponse),
    Failed(String),
}

/// A service that predicts the next phase's green durations
pub trait PredictionService {
    /// Submit a new request, replacing any in-flight one
    fn submit(&mut self, records: Vec<ApproachRecord>);

    /// Poll for the outcome of the last submitted request. `Ready` and
    /// `Failed` are terminal: subsequent polls return `Idle`.
    fn poll(&mut self) -> PredictionPoll;
}

/// Service stub for running without a prediction backend; every request
/// fails immediately, so the controller always uses its local fallback.
#[derive(Debug, Default)]
pub struct NoPrediction {
    pending: bool,
}

impl PredictionService for NoPrediction {
    fn submit(&mut self, _records: Vec<ApproachRecord>) {
        self.pending = true;
    }

    fn poll(&mut self) -> PredictionPoll {
        if self.pending {
            self.pending = false;
            PredictionPoll::Failed("no prediction backend configured".into())
        } else {
            PredictionPoll::Idle
        }
    }
}

/// Detector identifiers mirroring the deployed approach sensors
fn detector_id(direction: Direction) -> &'static str {
    match direction {
        Direction::East => "VLRJX20",
        Direction::West => "VLRJM60",
        Direction::South => "VLRJX00",
        Direction::North => "VLRJX10",
    }
}

/// Build the per-approach records for a request from a flow snapshot
pub fn build_request(snapshot: &FlowSnapshot, now: TimeOfDay) -> Vec<ApproachRecord> {
    ALL_DIRECTIONS
        .iter()
        .enumerate()
        .map(|(lane_id, &direction)| {
            let flow = snapshot.direction(direction);
            ApproachRecord {
                id: detector_id(direction).to_string(),
                day_of_week: now.day_of_week,
                hour: now.hour,
                minute: now.minute,
                second: now.second,
                is_peak_hour: now.is_peak_hour(),
                lane_id: lane_id as u32,
                lane_type: 1,
                speed: flow.average_speed,
                occupancy: flow.occupancy,
                volume_by_type: (
                    flow.count(VehicleType::Motor),
                    flow.count(VehicleType::Small),
                    flow.count(VehicleType::Large),
                ),
                speed_by_type: flow.speed_by_type,
            }
        })
        .collect()
}
