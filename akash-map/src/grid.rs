//! Ternary occupancy grid with an obstacle-inflated twin layer.
//!
//! The grid holds two parallel row-major `i8` arrays:
//!
//! - `raw`: the occupancy estimate as observed (0 unknown, +1 free,
//!   -1 occupied)
//! - `inflated`: recomputed from `raw` by dilating every occupied cell with
//!   a disk of the vehicle radius; used only for traversability tests
//!
//! A running count of cell states is maintained on every raw transition, so
//! `unknown + free + occupied == width * height` at all times.

use serde::{Deserialize, Serialize};

use crate::core::{CellState, GridCoord};
use crate::raycast::BresenhamLine;

/// Running tally of raw cell states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCounts {
    pub unknown: usize,
    pub free: usize,
    pub occupied: usize,
}

impl CellCounts {
    /// Total number of counted cells.
    pub fn total(&self) -> usize {
        self.unknown + self.free + self.occupied
    }
}

/// Serializable grid snapshot for the gateway / UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
    /// World coordinates of the grid corner (cell (0, 0) lower-left).
    pub origin: [f64; 2],
    /// Raw cell values in row-major order (`gy * width + gx`).
    pub cells: Vec<i8>,
    pub counts: CellCounts,
}

/// 2D occupancy grid centered on the world origin.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    raw: Vec<i8>,
    inflated: Vec<i8>,
    width: usize,
    height: usize,
    resolution: f64,
    origin_x: f64,
    origin_y: f64,
    /// Dilation disk offsets for the configured vehicle radius.
    inflation_offsets: Vec<(i32, i32)>,
    counts: CellCounts,
}

impl OccupancyGrid {
    /// Create a grid of `width x height` cells centered on the world origin.
    ///
    /// `robot_radius` (meters) fixes the obstacle inflation disk:
    /// `ceil(robot_radius / resolution)` cells.
    pub fn new(width: usize, height: usize, resolution: f64, robot_radius: f64) -> Self {
        let size = width * height;
        let inflation_cells = (robot_radius / resolution).ceil() as i32;

        let mut inflation_offsets = Vec::new();
        for dy in -inflation_cells..=inflation_cells {
            for dx in -inflation_cells..=inflation_cells {
                if dx * dx + dy * dy <= inflation_cells * inflation_cells {
                    inflation_offsets.push((dx, dy));
                }
            }
        }

        Self {
            raw: vec![0; size],
            inflated: vec![0; size],
            width,
            height,
            resolution,
            origin_x: -(width as f64) * resolution / 2.0,
            origin_y: -(height as f64) * resolution / 2.0,
            inflation_offsets,
            counts: CellCounts {
                unknown: size,
                free: 0,
                occupied: 0,
            },
        }
    }

    /// Grid width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Resolution in meters per cell.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World coordinates of cell (0, 0)'s corner.
    #[inline]
    pub fn origin(&self) -> (f64, f64) {
        (self.origin_x, self.origin_y)
    }

    /// Current raw cell state tally.
    #[inline]
    pub fn counts(&self) -> CellCounts {
        self.counts
    }

    // === Coordinate conversion ===

    /// Convert world coordinates to grid coordinates (may be off-map).
    #[inline]
    pub fn world_to_grid(&self, x: f64, y: f64) -> GridCoord {
        GridCoord::new(
            ((x - self.origin_x) / self.resolution).floor() as i32,
            ((y - self.origin_y) / self.resolution).floor() as i32,
        )
    }

    /// Convert grid coordinates to world coordinates (cell center).
    #[inline]
    pub fn grid_to_world(&self, coord: GridCoord) -> (f64, f64) {
        (
            (coord.x as f64 + 0.5) * self.resolution + self.origin_x,
            (coord.y as f64 + 0.5) * self.resolution + self.origin_y,
        )
    }

    /// Check whether a coordinate falls inside the grid.
    #[inline]
    pub fn in_map(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.width
            && (coord.y as usize) < self.height
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> usize {
        coord.y as usize * self.width + coord.x as usize
    }

    // === Cell access ===

    /// Raw cell state. Off-map reads are conservatively occupied.
    #[inline]
    pub fn get(&self, coord: GridCoord) -> CellState {
        if self.in_map(coord) {
            CellState::from_i8(self.raw[self.index(coord)])
        } else {
            CellState::Occupied
        }
    }

    /// Inflated cell state. Off-map reads are conservatively occupied.
    #[inline]
    pub fn get_inflated(&self, coord: GridCoord) -> CellState {
        if self.in_map(coord) {
            CellState::from_i8(self.inflated[self.index(coord)])
        } else {
            CellState::Occupied
        }
    }

    /// Set a raw cell, maintaining the state counters. Off-map writes are
    /// ignored.
    pub fn set(&mut self, coord: GridCoord, state: CellState) {
        if !self.in_map(coord) {
            return;
        }
        let idx = self.index(coord);
        let old = CellState::from_i8(self.raw[idx]);
        if old == state {
            return;
        }

        match old {
            CellState::Unknown => self.counts.unknown -= 1,
            CellState::Free => self.counts.free -= 1,
            CellState::Occupied => self.counts.occupied -= 1,
        }
        match state {
            CellState::Unknown => self.counts.unknown += 1,
            CellState::Free => self.counts.free += 1,
            CellState::Occupied => self.counts.occupied += 1,
        }
        self.raw[idx] = state.as_i8();
    }

    // === Observation updates ===

    /// Trace a ray between two cells, marking every visited cell that is not
    /// already occupied as free. The endpoint is visited too; its occupancy
    /// (typically a lidar hit) is set separately by the caller.
    pub fn raytrace(&mut self, from: GridCoord, to: GridCoord) {
        let step_cap = 2 * self.width.max(self.height);
        let cells: Vec<GridCoord> = BresenhamLine::with_step_cap(from, to, step_cap).collect();
        for coord in cells {
            if self.in_map(coord) && self.get(coord) != CellState::Occupied {
                self.set(coord, CellState::Free);
            }
        }
    }

    /// Mark unknown cells within a disk as free.
    ///
    /// Used to seed known-free space around the start position; without it
    /// there is no free/unknown boundary to bootstrap frontier detection.
    pub fn free_disk(&mut self, center: GridCoord, radius_cells: i32) {
        let mut seeded = 0usize;
        for dy in -radius_cells..=radius_cells {
            for dx in -radius_cells..=radius_cells {
                if dx * dx + dy * dy > radius_cells * radius_cells {
                    continue;
                }
                let coord = GridCoord::new(center.x + dx, center.y + dy);
                if self.in_map(coord) && self.get(coord) == CellState::Unknown {
                    self.set(coord, CellState::Free);
                    seeded += 1;
                }
            }
        }
        log::debug!(
            "seeded {} free cells around ({}, {})",
            seeded,
            center.x,
            center.y
        );
    }

    /// Recompute the inflated layer from raw.
    ///
    /// Every cell within the inflation disk of a raw-occupied cell becomes
    /// occupied in the inflated layer; raw-occupied cells are never
    /// downgraded there.
    pub fn inflate_obstacles(&mut self) {
        self.inflated.copy_from_slice(&self.raw);

        for gy in 0..self.height as i32 {
            for gx in 0..self.width as i32 {
                let idx = gy as usize * self.width + gx as usize;
                if self.raw[idx] != CellState::Occupied.as_i8() {
                    continue;
                }
                for &(dx, dy) in &self.inflation_offsets {
                    let n = GridCoord::new(gx + dx, gy + dy);
                    if self.in_map(n) {
                        let nidx = self.index(n);
                        self.inflated[nidx] = CellState::Occupied.as_i8();
                    }
                }
            }
        }
    }

    // === Statistics ===

    /// Area of observed (free or occupied) space in square meters.
    pub fn explored_area(&self) -> f64 {
        (self.counts.free + self.counts.occupied) as f64 * self.resolution * self.resolution
    }

    /// Count cell states within a world-frame disk (in-map cells only).
    ///
    /// Used for local density metrics around a candidate goal.
    pub fn disk_counts(&self, x: f64, y: f64, radius: f64) -> CellCounts {
        let center = self.world_to_grid(x, y);
        let radius_cells = (radius / self.resolution).ceil() as i32;
        let mut counts = CellCounts {
            unknown: 0,
            free: 0,
            occupied: 0,
        };

        for dy in -radius_cells..=radius_cells {
            for dx in -radius_cells..=radius_cells {
                let coord = GridCoord::new(center.x + dx, center.y + dy);
                if !self.in_map(coord) {
                    continue;
                }
                let (wx, wy) = self.grid_to_world(coord);
                if (wx - x).hypot(wy - y) > radius {
                    continue;
                }
                match self.get(coord) {
                    CellState::Unknown => counts.unknown += 1,
                    CellState::Free => counts.free += 1,
                    CellState::Occupied => counts.occupied += 1,
                }
            }
        }
        counts
    }

    /// Reset both layers to unknown.
    pub fn reset(&mut self) {
        self.raw.fill(0);
        self.inflated.fill(0);
        self.counts = CellCounts {
            unknown: self.raw.len(),
            free: 0,
            occupied: 0,
        };
    }

    // === Export ===

    /// Snapshot the raw layer for the gateway.
    pub fn export(&self) -> MapData {
        MapData {
            width: self.width,
            height: self.height,
            resolution: self.resolution,
            origin: [self.origin_x, self.origin_y],
            cells: self.raw.clone(),
            counts: self.counts,
        }
    }

    /// Render the raw layer as grayscale pixels for UI preview.
    ///
    /// Occupied is black, free is white, unknown is mid-gray.
    pub fn to_grayscale(&self) -> (usize, usize, Vec<u8>) {
        let pixels = self
            .raw
            .iter()
            .map(|&v| match CellState::from_i8(v) {
                CellState::Occupied => 0,
                CellState::Free => 255,
                CellState::Unknown => 127,
            })
            .collect();
        (self.width, self.height, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(100, 100, 0.2, 0.3)
    }

    #[test]
    fn test_counts_always_sum_to_size() {
        let mut g = grid();
        assert_eq!(g.counts().total(), 100 * 100);

        g.set(GridCoord::new(10, 10), CellState::Free);
        g.set(GridCoord::new(11, 10), CellState::Occupied);
        g.set(GridCoord::new(11, 10), CellState::Free);
        g.set(GridCoord::new(11, 10), CellState::Occupied);
        assert_eq!(g.counts().total(), 100 * 100);
        assert_eq!(g.counts().free, 1);
        assert_eq!(g.counts().occupied, 1);
    }

    #[test]
    fn test_coordinate_round_trip() {
        let g = grid();
        for coord in [
            GridCoord::new(0, 0),
            GridCoord::new(50, 50),
            GridCoord::new(99, 99),
            GridCoord::new(17, 83),
        ] {
            let (x, y) = g.grid_to_world(coord);
            assert_eq!(g.world_to_grid(x, y), coord);
        }
    }

    #[test]
    fn test_world_to_grid_floor_semantics() {
        let g = grid();
        // Origin at (-10, -10); world (0, 0) lands in cell (50, 50)
        assert_eq!(g.world_to_grid(0.0, 0.0), GridCoord::new(50, 50));
        // Just below a cell boundary stays in the lower cell
        assert_eq!(g.world_to_grid(-0.001, 0.0).x, 49);
    }

    #[test]
    fn test_off_map_reads_are_occupied() {
        let g = grid();
        assert_eq!(g.get(GridCoord::new(-1, 0)), CellState::Occupied);
        assert_eq!(g.get(GridCoord::new(0, 100)), CellState::Occupied);
        assert_eq!(g.get_inflated(GridCoord::new(100, 0)), CellState::Occupied);
    }

    #[test]
    fn test_raytrace_marks_free_but_never_downgrades() {
        let mut g = grid();
        // Pre-place an obstacle mid-ray
        g.set(GridCoord::new(60, 50), CellState::Occupied);

        g.raytrace(GridCoord::new(50, 50), GridCoord::new(70, 50));

        assert_eq!(g.get(GridCoord::new(55, 50)), CellState::Free);
        assert_eq!(g.get(GridCoord::new(70, 50)), CellState::Free);
        // The pre-existing obstacle survives
        assert_eq!(g.get(GridCoord::new(60, 50)), CellState::Occupied);
    }

    #[test]
    fn test_inflation_covers_disk() {
        let mut g = grid();
        g.set(GridCoord::new(50, 50), CellState::Occupied);
        g.inflate_obstacles();

        // Inflation radius: ceil(0.3 / 0.2) = 2 cells
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let coord = GridCoord::new(50 + dx, 50 + dy);
                if dx * dx + dy * dy <= 4 {
                    assert_eq!(
                        g.get_inflated(coord),
                        CellState::Occupied,
                        "cell ({}, {}) should be inflated",
                        coord.x,
                        coord.y
                    );
                }
            }
        }
        // Outside the disk stays untouched
        assert_eq!(g.get_inflated(GridCoord::new(53, 50)), CellState::Unknown);
        // Raw layer is untouched by inflation
        assert_eq!(g.get(GridCoord::new(51, 50)), CellState::Unknown);
    }

    #[test]
    fn test_inflation_never_downgrades_occupied() {
        let mut g = grid();
        g.set(GridCoord::new(40, 40), CellState::Occupied);
        g.set(GridCoord::new(41, 40), CellState::Free);
        g.inflate_obstacles();
        assert_eq!(g.get_inflated(GridCoord::new(40, 40)), CellState::Occupied);
        assert_eq!(g.get_inflated(GridCoord::new(41, 40)), CellState::Occupied);
    }

    #[test]
    fn test_free_disk_area() {
        let mut g = grid();
        g.free_disk(GridCoord::new(50, 50), 15);

        // 709 lattice cells fall within radius 15
        assert_eq!(g.counts().free, 709);
        assert_relative_eq!(g.explored_area(), 709.0 * 0.04, epsilon = 1e-9);
        // Close to the continuous disk area pi * (15 * 0.2)^2
        assert!((g.explored_area() - std::f64::consts::PI * 9.0).abs() < 0.2);
    }

    #[test]
    fn test_free_disk_preserves_obstacles() {
        let mut g = grid();
        g.set(GridCoord::new(52, 50), CellState::Occupied);
        g.free_disk(GridCoord::new(50, 50), 5);
        assert_eq!(g.get(GridCoord::new(52, 50)), CellState::Occupied);
    }

    #[test]
    fn test_explored_area_counts_occupied() {
        let mut g = grid();
        g.set(GridCoord::new(0, 0), CellState::Free);
        g.set(GridCoord::new(1, 0), CellState::Occupied);
        assert_relative_eq!(g.explored_area(), 2.0 * 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut g = grid();
        g.set(GridCoord::new(5, 5), CellState::Occupied);
        g.inflate_obstacles();
        g.reset();

        assert_eq!(g.get(GridCoord::new(5, 5)), CellState::Unknown);
        assert_eq!(g.get_inflated(GridCoord::new(5, 5)), CellState::Unknown);
        assert_eq!(g.counts().unknown, 100 * 100);
    }

    #[test]
    fn test_disk_counts() {
        let mut g = grid();
        g.free_disk(GridCoord::new(50, 50), 10);
        g.set(GridCoord::new(50, 50), CellState::Occupied);

        let counts = g.disk_counts(0.1, 0.1, 1.0);
        assert_eq!(counts.occupied, 1);
        assert!(counts.free > 0);
        assert_eq!(counts.unknown, 0);
    }

    #[test]
    fn test_export_snapshot() {
        let mut g = grid();
        g.set(GridCoord::new(3, 4), CellState::Occupied);
        let data = g.export();

        assert_eq!(data.width, 100);
        assert_eq!(data.cells.len(), 100 * 100);
        assert_eq!(data.cells[4 * 100 + 3], -1);
        assert_eq!(data.origin, [-10.0, -10.0]);
        assert_eq!(data.counts.occupied, 1);
    }

    #[test]
    fn test_grayscale_render() {
        let mut g = OccupancyGrid::new(10, 10, 0.2, 0.3);
        g.set(GridCoord::new(0, 0), CellState::Occupied);
        g.set(GridCoord::new(1, 1), CellState::Free);

        let (w, h, pixels) = g.to_grayscale();
        assert_eq!((w, h), (10, 10));
        assert_eq!(pixels[0], 0);
        assert_eq!(pixels[11], 255);
        assert_eq!(pixels[5], 127);
    }
}
