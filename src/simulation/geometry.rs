//! Intersection geometry
//!
//! One value object holding every layout-derived coordinate the simulation
//! needs: lane spawn points, stop lines, exit coordinates and the logical
//! bounds. It is computed once from the central-box rectangle and injected
//! into agents, so no simulation logic ever touches a rendering surface.

use super::types::{Direction, Point};

/// The central conflict area of the intersection, in world units
#[derive(Debug, Clone, Copy)]
pub struct CentralBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CentralBox {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Logical world bounds; leaving them in the travel direction forces
/// completion of an agent even if its target tolerance was never met
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Layout of one approach: where its lanes start and where vehicles exit
#[derive(Debug, Clone)]
struct Approach {
    lanes: Vec<Point>,
    /// Coordinate on the travel axis where a vehicle has fully left the scene
    exit: f32,
    /// Coordinate on the travel axis a vehicle head must not cross on red
    stop_line: f32,
}

/// All layout-derived coordinates, computed once per layout change
#[derive(Debug, Clone)]
pub struct IntersectionGeometry {
    east: Approach,
    west: Approach,
    south: Approach,
    north: Approach,
    pub bounds: Bounds,
    /// Perpendicular distance within which two vehicles share a lane
    pub lane_tolerance: f32,
}

impl IntersectionGeometry {
    /// Build geometry from a central box and the per-direction lane starts.
    /// Stop lines sit on the box edge facing each approach.
    pub fn from_central_box(
        central: CentralBox,
        east_lanes: Vec<Point>,
        west_lanes: Vec<Point>,
        south_lanes: Vec<Point>,
        north_lanes: Vec<Point>,
        bounds: Bounds,
    ) -> Self {
        Self {
            east: Approach {
                lanes: east_lanes,
                exit: bounds.right + 150.0,
                stop_line: central.x,
            },
            west: Approach {
                lanes: west_lanes,
                exit: bounds.left - 150.0,
                stop_line: central.right(),
            },
            south: Approach {
                lanes: south_lanes,
                exit: bounds.bottom + 150.0,
                stop_line: central.y,
            },
            north: Approach {
                lanes: north_lanes,
                exit: bounds.top - 150.0,
                stop_line: central.bottom(),
            },
            bounds,
            lane_tolerance: 25.0,
        }
    }

    /// The standard four-lane crossing layout used by the simulation
    pub fn standard() -> Self {
        let central = CentralBox {
            x: 385.0,
            y: 145.0,
            width: 230.0,
            height: 210.0,
        };
        let bounds = Bounds {
            left: -50.0,
            right: 1050.0,
            top: -50.0,
            bottom: 650.0,
        };
        Self::from_central_box(
            central,
            vec![
                Point::new(-100.0, 261.0),
                Point::new(-100.0, 288.0),
                Point::new(-100.0, 318.0),
                Point::new(-100.0, 344.0),
            ],
            vec![
                Point::new(1125.0, 230.0),
                Point::new(1125.0, 204.0),
                Point::new(1125.0, 177.0),
                Point::new(1125.0, 153.0),
            ],
            vec![
                Point::new(477.0, -185.0),
                Point::new(449.0, -185.0),
                Point::new(422.0, -185.0),
                Point::new(393.0, -185.0),
            ],
            vec![
                Point::new(505.0, 700.0),
                Point::new(534.0, 700.0),
                Point::new(562.0, 700.0),
                Point::new(591.0, 700.0),
            ],
            bounds,
        )
    }

    fn approach(&self, direction: Direction) -> &Approach {
        match direction {
            Direction::East => &self.east,
            Direction::West => &self.west,
            Direction::South => &self.south,
            Direction::North => &self.north,
        }
    }

    /// Number of lanes on an approach
    pub fn lane_count(&self, direction: Direction) -> usize {
        self.approach(direction).lanes.len()
    }

    /// Spawn point for a lane, if the index exists
    pub fn lane_start(&self, direction: Direction, lane: usize) -> Option<Point> {
        self.approach(direction).lanes.get(lane).copied()
    }

    /// Stop-line coordinate on the travel axis of the approach
    pub fn stop_line(&self, direction: Direction) -> f32 {
        self.approach(direction).stop_line
    }

    /// Target position for a vehicle spawned at `start` on this approach:
    /// straight-through travel, only the travel-axis coordinate changes.
    pub fn target_for(&self, direction: Direction, start: Point) -> Point {
        let exit = self.approach(direction).exit;
        if direction.is_horizontal() {
            Point::new(exit, start.y)
        } else {
            Point::new(start.x, exit)
        }
    }

    /// Whether a vehicle head coordinate has crossed the stop line
    pub fn past_stop_line(&self, direction: Direction, head: f32) -> bool {
        let line = self.stop_line(direction);
        match direction {
            Direction::East | Direction::South => head >= line,
            Direction::West | Direction::North => head <= line,
        }
    }

    /// Whether a position has fully left the logical bounds in its travel
    /// direction
    pub fn out_of_bounds(&self, direction: Direction, pos: Point) -> bool {
        match direction {
            Direction::East => pos.x >= self.bounds.right,
            Direction::West => pos.x <= self.bounds.left,
            Direction::North => pos.y <= self.bounds.top,
            Direction::South => pos.y >= self.bounds.bottom,
        }
    }
}
