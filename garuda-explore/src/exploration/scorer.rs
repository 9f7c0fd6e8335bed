//! Goal selection.
//!
//! Candidate frontier centroids run through a fixed filter chain (region of
//! interest, blacklist, path clarity over the inflated grid, window-trap
//! heuristic, occupancy, distance bounds, boundary) and the survivors are
//! ranked by a weighted score. Selection is deterministic: candidates are
//! evaluated in insertion order and ties keep the earlier candidate.

use akash_map::{cells_along_line, geometry, CellState, OccupancyGrid, Vec3};
use serde::Serialize;

use crate::config::ExplorationConfig;
use crate::exploration::frontier::Frontier;

/// Outright rejection radius around previously visited goals (meters).
const VISITED_REJECT_RADIUS: f64 = 0.3;

/// Radius of the visited-goal penalty falloff (meters).
const HISTORY_RADIUS: f64 = 2.0;

/// Radius of the local density disk (meters).
const DENSITY_RADIUS: f64 = 2.0;

/// Explored area above which the window-trap heuristic activates (m^2).
const WINDOW_TRAP_AREA: f64 = 50.0;

/// A candidate with no occupied cell within this radius is treated as an
/// aperture into unobserved exterior space (meters).
const WINDOW_TRAP_RADIUS: f64 = 1.5;

/// Altitude step when Z exploration enumerates levels (meters).
const HEIGHT_STEP: f64 = 0.5;

/// A selected exploration goal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Local density penalty at selection time, kept for telemetry.
    pub density: f64,
    pub path_clear: bool,
}

/// A point the engine refuses to plan near after repeated failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnreachableRecord {
    pub x: f64,
    pub y: f64,
}

/// A goal the vehicle actually arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisitedGoal {
    pub x: f64,
    pub y: f64,
}

/// Read-only state the scorer needs from the controller.
pub struct ScoreContext<'a> {
    pub grid: &'a OccupancyGrid,
    pub position: Vec3,
    pub unreachable: &'a [UnreachableRecord],
    pub visited: &'a [VisitedGoal],
    /// Unit xy direction of the previous goal, if any.
    pub last_direction: Option<[f64; 2]>,
    /// Observed scene bounding box (min, max), once derived.
    pub scene_bounds: Option<(Vec3, Vec3)>,
}

/// Scores frontier candidates against the current map and history.
pub struct GoalScorer<'a> {
    config: &'a ExplorationConfig,
}

impl<'a> GoalScorer<'a> {
    pub fn new(config: &'a ExplorationConfig) -> Self {
        Self { config }
    }

    /// Pick the best surviving candidate, if any.
    pub fn select(&self, candidates: &[Frontier], ctx: &ScoreContext) -> Option<Goal> {
        let mut best: Option<(f64, Goal)> = None;

        for candidate in candidates {
            let Some((score, goal)) = self.evaluate(candidate, ctx) else {
                continue;
            };
            let better = match &best {
                Some((best_score, _)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((score, goal));
            }
        }

        best.map(|(score, goal)| {
            log::debug!(
                "selected goal ({:.2}, {:.2}, {:.2}) score {:.3}",
                goal.x,
                goal.y,
                goal.z,
                score
            );
            goal
        })
    }

    /// Run the filter chain and score one candidate.
    fn evaluate(&self, candidate: &Frontier, ctx: &ScoreContext) -> Option<(f64, Goal)> {
        let cfg = self.config;
        let p = ctx.position;

        // 1. Region of interest
        if cfg.use_roi {
            if let Some(polygon) = &cfg.roi_polygon {
                if !geometry::point_in_polygon(candidate.x, candidate.y, polygon) {
                    return None;
                }
            }
        }

        // 2. Blacklist proximity
        let blacklisted = ctx.unreachable.iter().any(|u| {
            (u.x - candidate.x).hypot(u.y - candidate.y) < cfg.blacklist_radius
        });
        if blacklisted {
            return None;
        }

        // 3. Path clarity over the inflated grid; unknown cells block too,
        // planning through unmapped space is refused
        let from = ctx.grid.world_to_grid(p.x, p.y);
        let to = ctx.grid.world_to_grid(candidate.x, candidate.y);
        let path_clear = cells_along_line(from, to)
            .into_iter()
            .all(|cell| ctx.grid.get_inflated(cell) == CellState::Free);
        if !path_clear {
            return None;
        }

        // 4. Window trap: an isolated frontier in free-looking space is
        // probably an aperture into an unobserved exterior
        if ctx.grid.explored_area() > WINDOW_TRAP_AREA {
            let near = ctx.grid.disk_counts(candidate.x, candidate.y, WINDOW_TRAP_RADIUS);
            if near.occupied == 0 {
                return None;
            }
        }

        // 5. In-cell occupancy
        if ctx.grid.get(to) == CellState::Occupied {
            return None;
        }

        // 6. Distance bounds
        let distance = (candidate.x - p.x).hypot(candidate.y - p.y);
        if distance < cfg.min_goal_distance || distance > cfg.max_goal_distance {
            return None;
        }

        // 7. Boundary at the chosen altitude
        let z = self.select_height(candidate.x, candidate.y);
        if !self.within_bounds(candidate.x, candidate.y, z, ctx) {
            return None;
        }

        // Visited goals: outright reject when nearly coincident
        let revisit = ctx.visited.iter().any(|v| {
            (v.x - candidate.x).hypot(v.y - candidate.y) < VISITED_REJECT_RADIUS
        });
        if revisit {
            return None;
        }

        // Scoring terms
        let weights = &cfg.weights;

        let distance_cost = 1.0 / (1.0 + distance);
        let info_gain = (candidate.size as f64 / 50.0).min(1.0);

        let history_penalty: f64 = ctx
            .visited
            .iter()
            .map(|v| (v.x - candidate.x).hypot(v.y - candidate.y))
            .filter(|&d| d < HISTORY_RADIUS)
            .map(|d| 0.5 * (1.0 - d / HISTORY_RADIUS))
            .sum();

        let disk = ctx.grid.disk_counts(candidate.x, candidate.y, DENSITY_RADIUS);
        let density_penalty = if disk.total() > 0 {
            let total = disk.total() as f64;
            (disk.occupied as f64 / total + 0.3 * disk.unknown as f64 / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let direction_bonus = match ctx.last_direction {
            Some([ux, uy]) if distance > f64::EPSILON => {
                let dot = (candidate.x - p.x) / distance * ux + (candidate.y - p.y) / distance * uy;
                dot.max(0.0) * weights.consistency
            }
            _ => 0.0,
        };

        let score = weights.distance * distance_cost + weights.info_gain * info_gain
            - weights.history * history_penalty
            - weights.density * density_penalty
            + direction_bonus;

        Some((
            score,
            Goal {
                x: candidate.x,
                y: candidate.y,
                z,
                density: density_penalty,
                path_clear: true,
            },
        ))
    }

    /// Choose the goal altitude.
    ///
    /// With Z exploration the level is a deterministic hash of the xy cell,
    /// so the same spot maps to the same altitude across ticks.
    fn select_height(&self, x: f64, y: f64) -> f64 {
        let cfg = self.config;
        let z = if cfg.enable_z_exploration && cfg.max_height > cfg.min_height {
            let levels = ((cfg.max_height - cfg.min_height) / HEIGHT_STEP).floor() as u64 + 1;
            let key = (x * 10.0).floor() as i64 + (y * 10.0).floor() as i64;
            let index = mix_hash(key) % levels;
            cfg.min_height + index as f64 * HEIGHT_STEP
        } else {
            cfg.exploration_height
        };
        z.clamp(cfg.min_height, cfg.max_height)
    }

    fn within_bounds(&self, x: f64, y: f64, z: f64, ctx: &ScoreContext) -> bool {
        if let Some((min, max)) = ctx.scene_bounds {
            if x < min.x || x > max.x || y < min.y || y > max.y || z < min.z || z > max.z {
                return false;
            }
        }
        if let (Some(min), Some(max)) = (self.config.boundary_min, self.config.boundary_max) {
            if x < min.x || x > max.x || y < min.y || y > max.y || z < min.z || z > max.z {
                return false;
            }
        }
        true
    }
}

/// SplitMix64 finalizer; deterministic across runs and platforms.
fn mix_hash(key: i64) -> u64 {
    let mut h = (key as u64).wrapping_add(0x9e37_79b9_7f4a_7c15);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}
