//! Core coordinate and cell types.
//!
//! All world-frame quantities are meters with z up. Grid coordinates are
//! integer cell indices; conversion lives on [`crate::OccupancyGrid`].

use serde::{Deserialize, Serialize};

/// A point in the world frame (meters, z up).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal (xy) distance to another point.
    #[inline]
    pub fn distance_xy(&self, other: &Vec3) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Full 3D Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Integer cell indices into an occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Ternary occupancy estimate for a single cell.
///
/// Stored in the grid as an `i8`: 0 = unknown, +1 = free, -1 = occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Unknown,
    Free,
    Occupied,
}

impl CellState {
    /// Decode from the stored cell value.
    #[inline]
    pub fn from_i8(value: i8) -> Self {
        match value {
            1 => CellState::Free,
            -1 => CellState::Occupied,
            _ => CellState::Unknown,
        }
    }

    /// Encode to the stored cell value.
    #[inline]
    pub fn as_i8(&self) -> i8 {
        match self {
            CellState::Unknown => 0,
            CellState::Free => 1,
            CellState::Occupied => -1,
        }
    }
}
