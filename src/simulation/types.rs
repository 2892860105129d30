//! Core types for the intersection simulation
//!
//! Standalone types shared by every component: directions, axes, light
//! states, vehicle classification, and the session-unique vehicle id.

use std::fmt;
use std::str::FromStr;

/// A unique identifier for a vehicle agent
/// Simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle_{}", self.0)
    }
}

/// Travel direction of an approach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// All four directions, in a fixed iteration order
pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::East,
    Direction::West,
    Direction::South,
    Direction::North,
];

impl Direction {
    /// The signal axis this direction belongs to
    pub fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }

    /// Whether travel is along the horizontal (x) axis
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" => Ok(Direction::North),
            "south" => Ok(Direction::South),
            "east" => Ok(Direction::East),
            "west" => Ok(Direction::West),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// A pair of opposing directions that always share one light phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub fn opposite(self) -> Axis {
        match self {
            Axis::NorthSouth => Axis::EastWest,
            Axis::EastWest => Axis::NorthSouth,
        }
    }

    /// The two directions grouped under this axis
    pub fn directions(self) -> [Direction; 2] {
        match self {
            Axis::NorthSouth => [Direction::South, Direction::North],
            Axis::EastWest => [Direction::East, Direction::West],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::NorthSouth => "north-south",
            Axis::EastWest => "east-west",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal state for one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightState {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LightState::Green => "green",
            LightState::Yellow => "yellow",
            LightState::Red => "red",
        };
        f.write_str(s)
    }
}

/// Vehicle classification used for spawning, speed assignment and flow counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleType {
    Motor,
    Small,
    Large,
}

/// All vehicle types, in a fixed iteration order
pub const ALL_VEHICLE_TYPES: [VehicleType; 3] =
    [VehicleType::Motor, VehicleType::Small, VehicleType::Large];

impl VehicleType {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Motor => "motor",
            VehicleType::Small => "small",
            VehicleType::Large => "large",
        }
    }

    /// Footprint (width, height) in world units for a given travel direction.
    /// Vehicles travelling vertically use the rotated footprint.
    pub fn footprint(self, direction: Direction) -> (f32, f32) {
        let (long, short) = match self {
            VehicleType::Large => (35.0, 20.0),
            VehicleType::Small => (30.0, 18.0),
            VehicleType::Motor => (25.0, 15.0),
        };
        if direction.is_horizontal() {
            (long, short)
        } else {
            (short, long)
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "motor" => Ok(VehicleType::Motor),
            "small" => Ok(VehicleType::Small),
            "large" => Ok(VehicleType::Large),
            other => Err(format!("unknown vehicle type: {other}")),
        }
    }
}

/// A 2D position in world units. The y axis grows southward, matching the
/// screen-derived coordinate system the intersection layout was lifted from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(&self, other: &Point, t: f32) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Axis-aligned bounding box of a vehicle footprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn from_position(pos: Point, width: f32, height: f32) -> Self {
        Self {
            left: pos.x,
            right: pos.x + width,
            top: pos.y,
            bottom: pos.y + height,
        }
    }

    /// Overlap test along the travel axis of `direction`, used by the
    /// forward collision scan once two vehicles share a lane.
    pub fn overlaps_along(&self, other: &BoundingBox, direction: Direction) -> bool {
        if direction.is_horizontal() {
            !(self.right <= other.left || self.left >= other.right)
        } else {
            !(self.bottom <= other.top || self.top >= other.bottom)
        }
    }
}
