//! Process-wide event bus
//!
//! Components publish simulation events onto a queue; the session drains
//! the queue each tick, routes events to internal consumers (the flow
//! accumulator, agents waiting on light changes) and then hands them to any
//! registered external sinks. Delivery is best effort; every
//! consumer that depends on an event also polls the authoritative state.

use super::types::{Direction, LightState, VehicleId, VehicleType};

/// An event emitted by the simulation core
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    VehicleAdded {
        direction: Direction,
        vehicle_type: VehicleType,
        speed: f32,
        vehicle_id: VehicleId,
        /// Simulation time in seconds
        timestamp: f32,
    },
    VehicleRemoved {
        direction: Direction,
        vehicle_type: VehicleType,
        vehicle_id: VehicleId,
        final_speed: f32,
        travel_time: f32,
    },
    LightStateChanged {
        direction: Direction,
        state: LightState,
    },
    GreenLightStarted {
        axis: super::types::Axis,
    },
    GreenLightEnded {
        axis: super::types::Axis,
    },
    TrafficCycleReset {
        timestamp: f32,
        reason: &'static str,
    },
    /// Informational: the prediction service failed and fallback timings are
    /// in effect; external layers may surface a degraded-mode indicator
    PredictionDegraded {
        detail: String,
    },
}

type EventSink = Box<dyn FnMut(&SimEvent)>;

/// In-process publish/subscribe queue
#[derive(Default)]
pub struct EventBus {
    queue: Vec<SimEvent>,
    sinks: Vec<EventSink>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: SimEvent) {
        self.queue.push(event);
    }

    /// Register a passive external sink. Sinks observe every event drained
    /// after registration; none is required for core correctness.
    pub fn subscribe(&mut self, sink: impl FnMut(&SimEvent) + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Take all queued events, notifying external sinks in publish order.
    /// The caller routes the returned events to internal consumers.
    pub fn drain(&mut self) -> Vec<SimEvent> {
        let events = std::mem::take(&mut self.queue);
        for event in &events {
            for sink in &mut self.sinks {
                sink(event);
            }
        }
        events
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
