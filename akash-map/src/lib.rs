//! AkashMap - 2D occupancy mapping for indoor aerial exploration.
//!
//! Provides the planar map layer consumed by the exploration engine:
//!
//! - [`OccupancyGrid`]: ternary occupancy raster with an obstacle-inflated
//!   twin layer used for traversability tests
//! - [`BresenhamLine`]: integer ray casting for free-space carving
//! - Geometry helpers for region-of-interest polygon tests
//!
//! The grid is deliberately 2D: the vehicle flies at a chosen altitude and
//! only near-plane lidar returns are projected into the map.

pub mod core;
pub mod geometry;
pub mod grid;
pub mod raycast;

pub use crate::core::{CellState, GridCoord, Vec3};
pub use crate::grid::{CellCounts, MapData, OccupancyGrid};
pub use crate::raycast::{cells_along_line, BresenhamLine};
