//! Headless motion timeline
//!
//! Implements the renderer contract the vehicle agents drive: a
//! time-bounded linear interpolation from a start to a target position that
//! can be paused, resumed and killed without losing accumulated progress.
//! A graphical frontend would mirror these positions; the simulation itself
//! only ever reads them back.

use super::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimelineState {
    Running,
    Paused,
    Finished,
    Killed,
}

/// Linear position tween with pause/resume semantics
#[derive(Debug, Clone)]
pub struct MotionTimeline {
    start: Point,
    target: Point,
    duration: f32,
    /// Accumulated running time; does not advance while paused
    elapsed: f32,
    state: TimelineState,
}

impl MotionTimeline {
    pub fn new(start: Point, target: Point, duration: f32) -> Self {
        Self {
            start,
            target,
            duration: duration.max(f32::EPSILON),
            elapsed: 0.0,
            state: TimelineState::Running,
        }
    }

    /// Advance by `delta` seconds and return the interpolated position.
    /// Paused, finished and killed timelines hold their last position.
    pub fn advance(&mut self, delta: f32) -> Point {
        if self.state == TimelineState::Running {
            self.elapsed = (self.elapsed + delta).min(self.duration);
            if self.elapsed >= self.duration {
                self.state = TimelineState::Finished;
            }
        }
        self.position()
    }

    pub fn position(&self) -> Point {
        self.start.lerp(&self.target, self.progress())
    }

    /// Completion fraction in [0, 1]
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn target(&self) -> Point {
        self.target
    }

    pub fn pause(&mut self) {
        if self.state == TimelineState::Running {
            self.state = TimelineState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == TimelineState::Paused {
            self.state = TimelineState::Running;
        }
    }

    /// Force the timeline to its end, as when an agent leaves the logical
    /// bounds before positional tolerance is met
    pub fn complete(&mut self) {
        if self.state != TimelineState::Killed {
            self.elapsed = self.duration;
            self.state = TimelineState::Finished;
        }
    }

    /// Permanently stop the timeline; it will never advance again
    pub fn kill(&mut self) {
        self.state = TimelineState::Killed;
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimelineState::Paused
    }

    pub fn is_finished(&self) -> bool {
        self.state == TimelineState::Finished
    }
}
