//! Vehicle agents
//!
//! Each agent owns a motion timeline toward its exit point and a small
//! state machine deciding whether that timeline runs. An agent stops for a
//! red light at its stop line and for any vehicle too close ahead in its
//! lane. Light-change notifications are treated as unreliable: a queued
//! agent also polls its light on a timeout and runs a slower periodic
//! self-check, so a missed notification delays it rather than stranding it.

use anyhow::{bail, Result};
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::Rng;

use super::config::CollisionConfig;
use super::geometry::IntersectionGeometry;
use super::timeline::MotionTimeline;
use super::types::{BoundingBox, Direction, LightState, Point, VehicleId, VehicleType};

/// World units travelled per second per km/h of assigned speed
const WORLD_UNITS_PER_KMH: f32 = 2.0;
/// Delay between spawn and the start of motion (seconds)
const SETTLE_SECS: f32 = 1.0;
/// Remaining distance to the bounds below which an agent is considered
/// almost done and skips further stop-line and collision checks
const NEAR_COMPLETE_DISTANCE: f32 = 20.0;
/// Upper bound of the random delay before a queued agent pulls away
const RELEASE_JITTER_MAX: f32 = 2.0;
/// Interval of the queued-at-light fallback poll (seconds)
const LIGHT_POLL_SECS: f32 = 1.0;
/// Interval of the periodic queued-state self-check (seconds)
const SELF_CHECK_SECS: f32 = 2.0;

/// Lifecycle of one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    /// Spawned, holding still for the settle delay
    Spawning,
    Moving,
    /// Stopped at the stop line on a non-green light
    QueuedAtLight,
    /// Stopped behind a vehicle in the same lane
    QueuedBehindVehicle,
    /// Within [`NEAR_COMPLETE_DISTANCE`] of leaving the bounds
    NearComplete,
    Completed,
}

/// Whether an agent survived its update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Active,
    Completed,
}

/// Lightweight per-tick view of one agent, handed to every other agent's
/// collision scan. Views are a snapshot; an agent that completes mid-tick
/// simply stops mattering next tick.
#[derive(Debug, Clone, Copy)]
pub struct AgentView {
    pub id: VehicleId,
    pub direction: Direction,
    pub position: Point,
    pub bbox: BoundingBox,
    pub waiting: bool,
}

/// What the forward scan found directly ahead in the lane
struct Obstruction {
    /// Clear distance to the blocker's tail, negative on overlap
    gap: f32,
    overlap: bool,
    /// The blocker is itself stopped
    waiting: bool,
}

pub struct VehicleAgent {
    id: VehicleId,
    direction: Direction,
    lane: usize,
    vehicle_type: VehicleType,
    /// Assigned cruise speed in km/h
    speed: f32,
    timeline: MotionTimeline,
    state: VehicleState,
    spawned_at: f32,
    settle_until: f32,
    /// When the current stretch of motion began, for eased follow distances
    motion_started_at: f32,
    /// Scheduled pull-away time once a green has been observed
    release_at: Option<f32>,
    /// One-shot light-change watch; rearmed every time the agent queues
    watch_armed: bool,
    next_light_poll: f32,
    next_self_check: f32,
}

impl VehicleAgent {
    /// Spawn an agent at the start of `lane` on the given approach. The
    /// timeline covers the full run to the exit point at the assigned speed.
    pub fn spawn(
        id: VehicleId,
        direction: Direction,
        lane: usize,
        vehicle_type: VehicleType,
        speed: f32,
        geometry: &IntersectionGeometry,
        now: f32,
    ) -> Result<Self> {
        let Some(start) = geometry.lane_start(direction, lane) else {
            bail!("no lane {lane} on the {direction} approach");
        };
        let target = geometry.target_for(direction, start);
        let distance = start.distance(&target);
        let duration = distance / (speed * WORLD_UNITS_PER_KMH);
        trace!("{id} spawning: {vehicle_type} {direction} lane {lane} at {speed} km/h");
        Ok(Self {
            id,
            direction,
            lane,
            vehicle_type,
            speed,
            timeline: MotionTimeline::new(start, target, duration),
            state: VehicleState::Spawning,
            spawned_at: now,
            settle_until: now + SETTLE_SECS,
            motion_started_at: now + SETTLE_SECS,
            release_at: None,
            watch_armed: false,
            next_light_poll: 0.0,
            next_self_check: 0.0,
        })
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn position(&self) -> Point {
        self.timeline.position()
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn spawned_at(&self) -> f32 {
        self.spawned_at
    }

    /// Instantaneous speed: the assigned speed while moving, zero while
    /// settling or queued. Completion only ever happens in motion, so a
    /// completed agent reports the speed it exited at.
    pub fn current_speed(&self) -> f32 {
        match self.state {
            VehicleState::Moving | VehicleState::NearComplete | VehicleState::Completed => {
                self.speed
            }
            VehicleState::Spawning
            | VehicleState::QueuedAtLight
            | VehicleState::QueuedBehindVehicle => 0.0,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(
            self.state,
            VehicleState::QueuedAtLight | VehicleState::QueuedBehindVehicle
        )
    }

    pub fn bbox(&self) -> BoundingBox {
        let (w, h) = self.vehicle_type.footprint(self.direction);
        BoundingBox::from_position(self.position(), w, h)
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            direction: self.direction,
            position: self.position(),
            bbox: self.bbox(),
            waiting: self.is_waiting(),
        }
    }

    /// Leading coordinate of the footprint along the travel axis
    fn head(&self, bbox: &BoundingBox) -> f32 {
        match self.direction {
            Direction::East => bbox.right,
            Direction::West => bbox.left,
            Direction::South => bbox.bottom,
            Direction::North => bbox.top,
        }
    }

    /// Center coordinate on the axis perpendicular to travel
    fn perp_center(direction: Direction, bbox: &BoundingBox) -> f32 {
        if direction.is_horizontal() {
            (bbox.top + bbox.bottom) / 2.0
        } else {
            (bbox.left + bbox.right) / 2.0
        }
    }

    /// Clear distance from this agent's head to `other`'s tail, negative when
    /// `other` is behind or overlapping
    fn gap_to(&self, bbox: &BoundingBox, other: &BoundingBox) -> f32 {
        match self.direction {
            Direction::East => other.left - bbox.right,
            Direction::West => bbox.left - other.right,
            Direction::South => other.top - bbox.bottom,
            Direction::North => bbox.top - other.bottom,
        }
    }

    fn follow_distances(&self, config: &CollisionConfig, now: f32) -> (f32, f32) {
        // Relaxed thresholds right after pulling away so tightly packed
        // queues can unstick without re-triggering each other.
        if now - self.motion_started_at < config.easing_window {
            (config.eased_safe_distance, config.eased_stop_distance)
        } else {
            (config.safe_distance, config.stop_distance)
        }
    }

    /// Nearest obstruction ahead in this agent's lane, if any.
    fn scan_ahead(&self, others: &[AgentView], lane_tolerance: f32) -> Option<Obstruction> {
        let bbox = self.bbox();
        let my_perp = Self::perp_center(self.direction, &bbox);
        let mut nearest: Option<Obstruction> = None;
        for other in others {
            if other.id == self.id || other.direction != self.direction {
                continue;
            }
            let other_perp = Self::perp_center(self.direction, &other.bbox);
            if (my_perp - other_perp).abs() > lane_tolerance {
                continue;
            }
            let overlap = bbox.overlaps_along(&other.bbox, self.direction);
            let gap = self.gap_to(&bbox, &other.bbox);
            if gap < 0.0 && !overlap {
                // Fully behind us.
                continue;
            }
            match nearest {
                Some(ref best) if gap >= best.gap => {}
                _ => {
                    nearest = Some(Obstruction {
                        gap,
                        overlap,
                        waiting: other.waiting,
                    })
                }
            }
        }
        nearest
    }

    fn stop_for_light(&mut self, now: f32) {
        debug!("{} queued at the {} stop line", self.id, self.direction);
        self.timeline.pause();
        self.state = VehicleState::QueuedAtLight;
        self.release_at = None;
        self.watch_armed = true;
        self.next_light_poll = now + LIGHT_POLL_SECS;
        self.next_self_check = now + SELF_CHECK_SECS;
    }

    fn stop_behind(&mut self) {
        trace!("{} queued behind traffic", self.id);
        self.timeline.pause();
        self.state = VehicleState::QueuedBehindVehicle;
    }

    fn start_moving(&mut self, now: f32) {
        self.timeline.resume();
        self.state = VehicleState::Moving;
        self.motion_started_at = now;
        self.release_at = None;
        self.watch_armed = false;
    }

    /// Light-change notification from the outside. Delivery is assumed
    /// unreliable; the timeout poll and self-check cover a missed call.
    pub fn notify_light_change(&mut self, state: LightState, now: f32, rng: &mut StdRng) {
        if self.state != VehicleState::QueuedAtLight || !self.watch_armed {
            return;
        }
        if state == LightState::Green {
            self.watch_armed = false;
            self.schedule_release(now, rng);
        }
    }

    fn schedule_release(&mut self, now: f32, rng: &mut StdRng) {
        if self.release_at.is_none() {
            let jitter = rng.random_range(0.0..RELEASE_JITTER_MAX);
            self.release_at = Some(now + jitter);
            trace!("{} releasing in {jitter:.2}s", self.id);
        }
    }

    /// Advance the agent by one tick. `light` is the current signal for this
    /// agent's approach; `others` is the per-tick view of all live agents.
    pub fn update(
        &mut self,
        delta: f32,
        now: f32,
        light: LightState,
        others: &[AgentView],
        geometry: &IntersectionGeometry,
        config: &CollisionConfig,
        rng: &mut StdRng,
    ) -> AgentStatus {
        match self.state {
            VehicleState::Completed => return AgentStatus::Completed,
            VehicleState::Spawning => {
                if now >= self.settle_until {
                    self.start_moving(now);
                } else {
                    return AgentStatus::Active;
                }
            }
            VehicleState::QueuedAtLight => {
                self.update_queued_at_light(now, light, rng);
                if self.state != VehicleState::Moving {
                    return AgentStatus::Active;
                }
            }
            VehicleState::QueuedBehindVehicle => {
                self.update_queued_behind(now, others, geometry, config);
                if self.state != VehicleState::Moving {
                    return AgentStatus::Active;
                }
            }
            VehicleState::Moving | VehicleState::NearComplete => {}
        }

        // Forward scan before moving: a blocked lane overrides everything.
        if self.state == VehicleState::Moving {
            let (safe, stop) = self.follow_distances(config, now);
            if let Some(ahead) = self.scan_ahead(others, geometry.lane_tolerance) {
                if ahead.overlap || ahead.gap < stop {
                    warn!("{} critically close to traffic ahead, emergency stop", self.id);
                    self.stop_behind();
                    return AgentStatus::Active;
                }
                // A moving blocker at safe range is only followed; a stopped
                // one is queued behind before closing further.
                if ahead.waiting && ahead.gap < safe {
                    self.stop_behind();
                    return AgentStatus::Active;
                }
            }

            // Stop-line check: never cross on a non-green light.
            if light != LightState::Green {
                let bbox = self.bbox();
                let head = self.head(&bbox);
                if !geometry.past_stop_line(self.direction, head) {
                    let step = self.speed * WORLD_UNITS_PER_KMH * delta;
                    let next_head = match self.direction {
                        Direction::East | Direction::South => head + step,
                        Direction::West | Direction::North => head - step,
                    };
                    if geometry.past_stop_line(self.direction, next_head) {
                        self.stop_for_light(now);
                        return AgentStatus::Active;
                    }
                }
            }
        }

        let position = self.timeline.advance(delta);

        if self.state == VehicleState::Moving {
            // Committed to exit: nothing between here and the bounds can
            // stop this agent anymore.
            let to_exit = match self.direction {
                Direction::East => geometry.bounds.right - position.x,
                Direction::West => position.x - geometry.bounds.left,
                Direction::South => geometry.bounds.bottom - position.y,
                Direction::North => position.y - geometry.bounds.top,
            };
            if to_exit < NEAR_COMPLETE_DISTANCE {
                self.state = VehicleState::NearComplete;
            }
        }

        if self.timeline.is_finished() || geometry.out_of_bounds(self.direction, position) {
            if !self.timeline.is_finished() {
                // Left the logical bounds before the exact target; complete
                // anyway and freeze the tween where it is.
                self.timeline.kill();
            }
            debug!("{} completed its run {}", self.id, self.direction);
            self.state = VehicleState::Completed;
            return AgentStatus::Completed;
        }

        AgentStatus::Active
    }

    fn update_queued_at_light(&mut self, now: f32, light: LightState, rng: &mut StdRng) {
        // A green that reverted before the release fired no longer applies.
        if light != LightState::Green {
            self.release_at = None;
            self.watch_armed = true;
        }

        if self.release_at.is_none() && now >= self.next_light_poll {
            self.next_light_poll = now + LIGHT_POLL_SECS;
            if light == LightState::Green {
                trace!("{} saw green on the timeout poll", self.id);
                self.schedule_release(now, rng);
            }
        }

        if now >= self.next_self_check {
            self.next_self_check = now + SELF_CHECK_SECS;
            if light == LightState::Green && self.release_at.is_none() {
                debug!("{} self-check caught a missed green", self.id);
                self.schedule_release(now, rng);
            }
        }

        if let Some(release) = self.release_at {
            if now >= release && light == LightState::Green {
                self.start_moving(now);
            }
        }
    }

    fn update_queued_behind(
        &mut self,
        now: f32,
        others: &[AgentView],
        geometry: &IntersectionGeometry,
        config: &CollisionConfig,
    ) {
        match self.scan_ahead(others, geometry.lane_tolerance) {
            Some(ahead) if ahead.overlap || ahead.gap <= config.resume_distance => {}
            _ => {
                trace!("{} resuming, lane ahead is clear", self.id);
                self.start_moving(now);
            }
        }
    }
}
