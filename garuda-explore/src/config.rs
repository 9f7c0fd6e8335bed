//! Engine configuration.
//!
//! Everything tunable lives in [`ExplorationConfig`]: map geometry, budgets,
//! frontier clustering, scoring weights, and the recovery thresholds
//! (arrival timeout, stuck detection, attempt budget). Values load from a
//! TOML file with per-field defaults, and a subset can be overridden per
//! session through [`StartOptions`].

use crate::error::{ExploreError, Result};
use akash_map::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Weights of the goal scoring terms, each in [0, 1].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    /// Reward for expected newly observed area (cluster size).
    #[serde(default = "default_info_gain_weight")]
    pub info_gain: f64,

    /// Reward for proximity (1 / (1 + distance)).
    #[serde(default = "default_distance_weight")]
    pub distance: f64,

    /// Bonus for continuing in the previous goal direction.
    #[serde(default = "default_consistency_weight")]
    pub consistency: f64,

    /// Penalty for cluttered or poorly observed surroundings.
    #[serde(default = "default_density_weight")]
    pub density: f64,

    /// Penalty for re-selecting near previously visited goals.
    #[serde(default = "default_history_weight")]
    pub history: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            info_gain: default_info_gain_weight(),
            distance: default_distance_weight(),
            consistency: default_consistency_weight(),
            density: default_density_weight(),
            history: default_history_weight(),
        }
    }
}

impl ScoringWeights {
    /// Reject weights outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("infoGain", self.info_gain),
            ("distance", self.distance),
            ("consistency", self.consistency),
            ("density", self.density),
            ("history", self.history),
        ];
        for (name, value) in named {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ExploreError::Config(format!(
                    "scoring weight {} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Per-session overrides accepted by `start_exploration`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOptions {
    #[serde(default)]
    pub start_position: Option<Vec3>,
    #[serde(default)]
    pub max_distance: Option<f64>,
    #[serde(default)]
    pub max_duration_secs: Option<f64>,
    #[serde(default)]
    pub exploration_height: Option<f64>,
    #[serde(default)]
    pub enable_z_exploration: Option<bool>,
    #[serde(default)]
    pub min_height: Option<f64>,
    #[serde(default)]
    pub max_height: Option<f64>,
    #[serde(default)]
    pub boundary_min: Option<Vec3>,
    #[serde(default)]
    pub boundary_max: Option<Vec3>,
}

/// Full engine configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ExplorationConfig {
    // --- Map geometry ---
    /// Grid resolution in meters per cell.
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Grid width in cells.
    #[serde(default = "default_grid_width")]
    pub grid_width: usize,

    /// Grid height in cells.
    #[serde(default = "default_grid_height")]
    pub grid_height: usize,

    /// Vehicle radius for obstacle inflation (meters).
    #[serde(default = "default_robot_radius")]
    pub robot_radius: f64,

    // --- Exploration budgets ---
    /// Maximum horizontal distance from the start position (meters).
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,

    /// Maximum session duration (seconds).
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: f64,

    // --- Frontier detection ---
    /// Single-linkage clustering radius (meters).
    #[serde(default = "default_cluster_radius")]
    pub cluster_radius: f64,

    /// Minimum cells for a frontier cluster to survive.
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    // --- Altitude ---
    /// Flight altitude when Z exploration is disabled (meters).
    #[serde(default = "default_exploration_height")]
    pub exploration_height: f64,

    /// Enumerate discrete altitude levels per goal.
    #[serde(default)]
    pub enable_z_exploration: bool,

    #[serde(default = "default_min_height")]
    pub min_height: f64,

    #[serde(default = "default_max_height")]
    pub max_height: f64,

    // --- Planning cadence ---
    /// Minimum interval between planning ticks (milliseconds).
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Delay between publishing a mission and its START command (ms).
    #[serde(default = "default_start_command_delay_ms")]
    pub start_command_delay_ms: u64,

    /// Distance to goal at which replanning may begin early (meters).
    #[serde(default = "default_replan_horizon")]
    pub replan_horizon: f64,

    // --- Bounds and ROI ---
    /// Optional hard bounding box, min corner.
    #[serde(default)]
    pub boundary_min: Option<Vec3>,

    /// Optional hard bounding box, max corner.
    #[serde(default)]
    pub boundary_max: Option<Vec3>,

    /// Region-of-interest polygon vertices (world xy).
    #[serde(default)]
    pub roi_polygon: Option<Vec<[f64; 2]>>,

    /// Suppress goals outside the ROI polygon.
    #[serde(default)]
    pub use_roi: bool,

    // --- Goal selection ---
    #[serde(default)]
    pub weights: ScoringWeights,

    /// Reject goals closer than this (meters).
    #[serde(default = "default_min_goal_distance")]
    pub min_goal_distance: f64,

    /// Reject goals farther than this (meters).
    #[serde(default = "default_max_goal_distance")]
    pub max_goal_distance: f64,

    /// Reject goals within this distance of a blacklisted point (meters).
    #[serde(default = "default_blacklist_radius")]
    pub blacklist_radius: f64,

    // --- Arrival and recovery ---
    /// Horizontal distance that counts as arrival (meters).
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius: f64,

    /// Give up waiting for arrival after this long (seconds).
    #[serde(default = "default_arrival_timeout_secs")]
    pub arrival_timeout_secs: f64,

    /// Failed attempts before a goal is blacklisted.
    #[serde(default = "default_max_goal_attempts")]
    pub max_goal_attempts: u32,

    /// Below this speed the vehicle counts as not moving (m/s).
    #[serde(default = "default_stuck_velocity")]
    pub stuck_velocity: f64,

    /// Not moving for this long counts as stuck (seconds).
    #[serde(default = "default_stuck_timeout_secs")]
    pub stuck_timeout_secs: f64,

    // --- Map update ---
    /// Point cloud downsampling stride.
    #[serde(default = "default_cloud_stride")]
    pub cloud_stride: usize,

    /// Only project returns within this vertical band of the vehicle (m).
    #[serde(default = "default_projection_band")]
    pub projection_band: f64,

    // --- Missions and telemetry ---
    /// Waypoint spacing along synthesized missions (meters).
    #[serde(default = "default_waypoint_spacing")]
    pub waypoint_spacing: f64,

    /// Radius of the seeded free disk around the start (cells).
    #[serde(default = "default_seed_radius_cells")]
    pub seed_radius_cells: i32,

    /// Status event cadence during exploration (seconds).
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            grid_width: default_grid_width(),
            grid_height: default_grid_height(),
            robot_radius: default_robot_radius(),
            max_distance: default_max_distance(),
            max_duration_secs: default_max_duration_secs(),
            cluster_radius: default_cluster_radius(),
            min_cluster_size: default_min_cluster_size(),
            exploration_height: default_exploration_height(),
            enable_z_exploration: false,
            min_height: default_min_height(),
            max_height: default_max_height(),
            update_interval_ms: default_update_interval_ms(),
            start_command_delay_ms: default_start_command_delay_ms(),
            replan_horizon: default_replan_horizon(),
            boundary_min: None,
            boundary_max: None,
            roi_polygon: None,
            use_roi: false,
            weights: ScoringWeights::default(),
            min_goal_distance: default_min_goal_distance(),
            max_goal_distance: default_max_goal_distance(),
            blacklist_radius: default_blacklist_radius(),
            arrival_radius: default_arrival_radius(),
            arrival_timeout_secs: default_arrival_timeout_secs(),
            max_goal_attempts: default_max_goal_attempts(),
            stuck_velocity: default_stuck_velocity(),
            stuck_timeout_secs: default_stuck_timeout_secs(),
            cloud_stride: default_cloud_stride(),
            projection_band: default_projection_band(),
            waypoint_spacing: default_waypoint_spacing(),
            seed_radius_cells: default_seed_radius_cells(),
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

impl ExplorationConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExploreError::Config(format!("failed to read config file: {}", e)))?;
        let config: ExplorationConfig = toml::from_str(&content)?;
        config.weights.validate()?;
        Ok(config)
    }

    /// Merge per-session overrides into this configuration.
    pub fn apply_start_options(&mut self, opts: &StartOptions) {
        if let Some(v) = opts.max_distance {
            self.max_distance = v;
        }
        if let Some(v) = opts.max_duration_secs {
            self.max_duration_secs = v;
        }
        if let Some(v) = opts.exploration_height {
            self.exploration_height = v;
        }
        if let Some(v) = opts.enable_z_exploration {
            self.enable_z_exploration = v;
        }
        if let Some(v) = opts.min_height {
            self.min_height = v;
        }
        if let Some(v) = opts.max_height {
            self.max_height = v;
        }
        if let Some(v) = opts.boundary_min {
            self.boundary_min = Some(v);
        }
        if let Some(v) = opts.boundary_max {
            self.boundary_max = Some(v);
        }
    }
}

// Default value functions

fn default_resolution() -> f64 {
    0.2
}
fn default_grid_width() -> usize {
    100
}
fn default_grid_height() -> usize {
    100
}
fn default_robot_radius() -> f64 {
    0.3
}
fn default_max_distance() -> f64 {
    15.0
}
fn default_max_duration_secs() -> f64 {
    600.0
}
fn default_cluster_radius() -> f64 {
    0.5
}
fn default_min_cluster_size() -> usize {
    3
}
fn default_exploration_height() -> f64 {
    1.0
}
fn default_min_height() -> f64 {
    0.5
}
fn default_max_height() -> f64 {
    2.0
}
fn default_update_interval_ms() -> u64 {
    1000
}
fn default_start_command_delay_ms() -> u64 {
    500
}
fn default_replan_horizon() -> f64 {
    1.5
}
fn default_min_goal_distance() -> f64 {
    0.5
}
fn default_max_goal_distance() -> f64 {
    15.0
}
fn default_blacklist_radius() -> f64 {
    2.0
}
fn default_arrival_radius() -> f64 {
    0.3
}
fn default_arrival_timeout_secs() -> f64 {
    8.0
}
fn default_max_goal_attempts() -> u32 {
    5
}
fn default_stuck_velocity() -> f64 {
    0.1
}
fn default_stuck_timeout_secs() -> f64 {
    3.0
}
fn default_cloud_stride() -> usize {
    10
}
fn default_projection_band() -> f64 {
    1.0
}
fn default_waypoint_spacing() -> f64 {
    2.0
}
fn default_seed_radius_cells() -> i32 {
    15
}
fn default_status_interval_secs() -> f64 {
    2.0
}

// Scoring weight defaults

fn default_info_gain_weight() -> f64 {
    1.0
}
fn default_distance_weight() -> f64 {
    1.0
}
fn default_consistency_weight() -> f64 {
    0.5
}
fn default_density_weight() -> f64 {
    0.5
}
fn default_history_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExplorationConfig::default();
        assert_eq!(config.resolution, 0.2);
        assert_eq!(config.grid_width, 100);
        assert_eq!(config.max_goal_attempts, 5);
        assert_eq!(config.update_interval_ms, 1000);
        assert!(!config.use_roi);
        assert!(config.boundary_min.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: ExplorationConfig = toml::from_str(
            r#"
            resolution = 0.1
            max_distance = 8.0

            [weights]
            distance = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(config.resolution, 0.1);
        assert_eq!(config.max_distance, 8.0);
        assert_eq!(config.weights.distance, 0.7);
        // Untouched fields keep defaults
        assert_eq!(config.weights.info_gain, 1.0);
        assert_eq!(config.grid_height, 100);
    }

    #[test]
    fn test_weight_validation() {
        let mut weights = ScoringWeights::default();
        assert!(weights.validate().is_ok());

        weights.density = 1.5;
        assert!(weights.validate().is_err());

        weights.density = -0.1;
        assert!(weights.validate().is_err());

        weights.density = 0.0;
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_apply_start_options() {
        let mut config = ExplorationConfig::default();
        let opts = StartOptions {
            max_distance: Some(5.0),
            exploration_height: Some(1.4),
            boundary_min: Some(Vec3::new(-3.0, -3.0, 0.0)),
            ..Default::default()
        };

        config.apply_start_options(&opts);
        assert_eq!(config.max_distance, 5.0);
        assert_eq!(config.exploration_height, 1.4);
        assert!(config.boundary_min.is_some());
        // Fields without overrides are untouched
        assert_eq!(config.max_duration_secs, 600.0);
    }
}
