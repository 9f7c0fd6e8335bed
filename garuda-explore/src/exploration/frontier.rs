//! Frontier detection.
//!
//! A frontier cell is a known-free cell with at least one unknown
//! 8-neighbor; clusters of them are the candidate places to extend the
//! map. Detection is deterministic: cells are scanned in row-major order
//! and clustered greedily in discovery order, so identical maps always
//! yield identical clusters.

use akash_map::{CellState, GridCoord, OccupancyGrid, Vec3};

/// A frontier cluster centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frontier {
    pub x: f64,
    pub y: f64,
    /// Number of raw frontier cells in the cluster.
    pub size: usize,
}

/// Detects and clusters frontier cells in a bounded window around the
/// vehicle.
#[derive(Debug, Clone)]
pub struct FrontierDetector {
    cluster_radius: f64,
    min_cluster_size: usize,
}

impl FrontierDetector {
    pub fn new(cluster_radius: f64, min_cluster_size: usize) -> Self {
        Self {
            cluster_radius,
            min_cluster_size,
        }
    }

    /// Detect frontier clusters near the vehicle.
    ///
    /// The search window is a square of half-side `max_distance` centered
    /// on the vehicle cell, clipped one cell inside the map border so the
    /// 8-neighborhood is always addressable.
    pub fn detect(&self, grid: &OccupancyGrid, position: Vec3, max_distance: f64) -> Vec<Frontier> {
        let cells = self.find_frontier_cells(grid, position, max_distance);
        if cells.is_empty() {
            return Vec::new();
        }

        let clusters = self.cluster_cells(&cells);

        let frontiers: Vec<Frontier> = clusters
            .into_iter()
            .filter(|cluster| cluster.len() >= self.min_cluster_size)
            .map(|cluster| {
                let size = cluster.len();
                let sum_x: f64 = cluster.iter().map(|&i| cells[i].0).sum();
                let sum_y: f64 = cluster.iter().map(|&i| cells[i].1).sum();
                Frontier {
                    x: sum_x / size as f64,
                    y: sum_y / size as f64,
                    size,
                }
            })
            .collect();

        log::debug!(
            "frontier detection: {} raw cells -> {} clusters",
            cells.len(),
            frontiers.len()
        );
        frontiers
    }

    /// Scan the window for free cells bordering unknown space.
    ///
    /// Returns world positions of the cell centers in row-major discovery
    /// order.
    fn find_frontier_cells(
        &self,
        grid: &OccupancyGrid,
        position: Vec3,
        max_distance: f64,
    ) -> Vec<(f64, f64)> {
        let center = grid.world_to_grid(position.x, position.y);
        let half = (max_distance / grid.resolution()).ceil() as i32;

        let min_x = (center.x - half).max(1);
        let max_x = (center.x + half).min(grid.width() as i32 - 2);
        let min_y = (center.y - half).max(1);
        let max_y = (center.y + half).min(grid.height() as i32 - 2);

        const NEIGHBORS: [(i32, i32); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];

        let mut cells = Vec::new();
        for gy in min_y..=max_y {
            for gx in min_x..=max_x {
                let coord = GridCoord::new(gx, gy);
                if grid.get(coord) != CellState::Free {
                    continue;
                }

                let borders_unknown = NEIGHBORS.iter().any(|&(dx, dy)| {
                    grid.get(GridCoord::new(gx + dx, gy + dy)) == CellState::Unknown
                });

                if borders_unknown {
                    cells.push(grid.grid_to_world(coord));
                }
            }
        }
        cells
    }

    /// Greedy clustering in discovery order.
    ///
    /// Each unvisited point opens a cluster and claims every later
    /// unvisited point within `cluster_radius` of the seed. Linking to the
    /// seed rather than transitively keeps a long connected boundary from
    /// collapsing into one cluster whose centroid sits in already-explored
    /// space; instead it splits into radius-sized arcs, each a usable goal
    /// candidate. O(n^2) in the raw cell count, acceptable for the bounded
    /// window at working resolutions.
    fn cluster_cells(&self, cells: &[(f64, f64)]) -> Vec<Vec<usize>> {
        let radius_sq = self.cluster_radius * self.cluster_radius;
        let mut visited = vec![false; cells.len()];
        let mut clusters = Vec::new();

        for seed in 0..cells.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            let (sx, sy) = cells[seed];
            let mut cluster = vec![seed];
            for candidate in seed + 1..cells.len() {
                if visited[candidate] {
                    continue;
                }
                let (cx, cy) = cells[candidate];
                let dx = cx - sx;
                let dy = cy - sy;
                if dx * dx + dy * dy <= radius_sq {
                    visited[candidate] = true;
                    cluster.push(candidate);
                }
            }
            clusters.push(cluster);
        }
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(100, 100, 0.2, 0.3)
    }

    fn detector() -> FrontierDetector {
        FrontierDetector::new(0.5, 3)
    }

    #[test]
    fn test_single_ray_splits_into_arc_clusters() {
        // One ray 40 cells east of the vehicle, endpoint occupied. Every
        // free cell on the ray borders the unknown rows above and below,
        // so the line splits into seed-radius arcs: 13 clusters of 3 cells
        // plus a trailing single-cell cluster discarded by min size.
        let mut g = grid();
        let from = g.world_to_grid(0.0, 0.0);
        let to = GridCoord::new(from.x + 40, from.y);
        g.raytrace(from, to);
        g.set(to, CellState::Occupied);

        let frontiers = detector().detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0);

        assert_eq!(frontiers.len(), 13);
        assert!(frontiers.iter().all(|f| f.size == 3));
        assert_relative_eq!(frontiers[0].x, 0.3, epsilon = 1e-9);
        assert_relative_eq!(frontiers[12].x, 7.5, epsilon = 1e-9);
        assert_relative_eq!(frontiers[0].y, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_no_frontiers_in_unknown_map() {
        let g = grid();
        assert!(detector()
            .detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0)
            .is_empty());
    }

    #[test]
    fn test_no_frontiers_when_fully_free() {
        let mut g = grid();
        for gy in 0..100 {
            for gx in 0..100 {
                g.set(GridCoord::new(gx, gy), CellState::Free);
            }
        }
        assert!(detector()
            .detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0)
            .is_empty());
    }

    #[test]
    fn test_seeded_disk_produces_boundary_ring() {
        let mut g = grid();
        g.free_disk(g.world_to_grid(0.0, 0.0), 15);

        let frontiers = detector().detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0);
        assert!(!frontiers.is_empty());

        // Centroids sit on the disk boundary, roughly 3 m out
        for f in &frontiers {
            let r = f.x.hypot(f.y);
            assert!(r > 1.5 && r < 3.5, "centroid radius {} out of range", r);
        }
    }

    #[test]
    fn test_min_cluster_size_discards_specks() {
        let mut g = grid();
        // Two isolated free cells surrounded by unknown
        g.set(GridCoord::new(30, 30), CellState::Free);
        g.set(GridCoord::new(70, 70), CellState::Free);

        let strict = FrontierDetector::new(0.5, 3);
        assert!(strict.detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0).is_empty());

        let lenient = FrontierDetector::new(0.5, 1);
        assert_eq!(
            lenient.detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0).len(),
            2
        );
    }

    #[test]
    fn test_separated_regions_stay_distinct_clusters() {
        let mut g = grid();
        // Two free strips far apart (> cluster radius)
        for gx in 40..45 {
            g.set(GridCoord::new(gx, 40), CellState::Free);
            g.set(GridCoord::new(gx, 60), CellState::Free);
        }

        // Each 5-cell strip yields one 3-cell seed cluster; the 2-cell
        // remainder is discarded by min size
        let frontiers = detector().detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0);
        assert_eq!(frontiers.len(), 2);
        assert_eq!(frontiers[0].size, 3);
        assert_eq!(frontiers[1].size, 3);
        // Discovery order is row-major, lower strip first
        assert!(frontiers[0].y < frontiers[1].y);
    }

    #[test]
    fn test_window_restricts_search() {
        let mut g = grid();
        // Free strip ~8 m from the vehicle
        for gx in 90..95 {
            g.set(GridCoord::new(gx, 50), CellState::Free);
        }

        let far = detector().detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0);
        assert_eq!(far.len(), 1);

        // A 2 m window around the origin cannot see it
        let near = detector().detect(&g, Vec3::new(0.0, 0.0, 1.0), 2.0);
        assert!(near.is_empty());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut g = grid();
        g.free_disk(g.world_to_grid(0.0, 0.0), 15);
        for gx in 40..55 {
            g.set(GridCoord::new(gx, 58), CellState::Occupied);
        }

        let a = detector().detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0);
        let b = detector().detect(&g, Vec3::new(0.0, 0.0, 1.0), 15.0);
        assert_eq!(a, b);
    }
}
