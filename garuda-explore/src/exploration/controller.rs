//! Exploration controller state machine.
//!
//! Single-threaded and event-driven: pose and cloud events, control calls,
//! and a monotonic clock are the only inputs. No handler blocks; planning
//! runs to completion inside a cloud event and arrival is discovered on a
//! later pose event. Failures recover locally (attempt counting,
//! blacklisting, graceful stops) and never escape a handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use akash_map::{MapData, OccupancyGrid, Vec3};

use crate::bus::{BusAdapter, ExecutionAction, ExecutionCommand, Mission, Odometry, PointCloud};
use crate::clock::Clock;
use crate::config::{ExplorationConfig, ScoringWeights, StartOptions};
use crate::error::{ExploreError, Result};
use crate::events::{EngineEvent, EventSender, StatusReport, StopReason};
use crate::exploration::frontier::FrontierDetector;
use crate::exploration::mission::{exploration_mission, return_home_mission};
use crate::exploration::scorer::{Goal, GoalScorer, ScoreContext, UnreachableRecord, VisitedGoal};

/// Delay before the first planning tick after a session starts.
const FIRST_TICK_DELAY: Duration = Duration::from_millis(500);

/// Distance from start below which a stop skips the return-home leg (m).
const RETURN_HOME_MIN_DISTANCE: f64 = 1.0;

/// Arrival tolerance for the return-home leg (meters).
const RETURN_HOME_RADIUS: f64 = 0.5;

/// Inward shrink applied to the observed scene box (meters).
const SCENE_BOUNDS_MARGIN: f64 = 1.5;

/// Minimum cloud size for scene bound derivation.
const SCENE_BOUNDS_MIN_POINTS: usize = 100;

/// Top-level lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Fresh or reset; no session yet.
    Idle,
    /// Actively exploring (possibly paused or waiting for arrival).
    Exploring,
    /// Session over, flying back to the start position.
    ReturningHome,
    /// Session over.
    Stopped,
}

/// Per-goal attempt key: xy rounded to a decimeter.
pub type GoalKey = (i64, i64);

fn goal_key(x: f64, y: f64) -> GoalKey {
    ((x * 10.0).round() as i64, (y * 10.0).round() as i64)
}

/// Execution command deferred until its publish time.
struct PendingStart {
    mission_id: String,
    due: Duration,
}

/// The exploration engine.
///
/// Owns the occupancy grid and all bookkeeping; references the bus adapter
/// and emits [`EngineEvent`]s through the channel handed in at
/// construction.
pub struct ExplorationController {
    config: ExplorationConfig,
    grid: OccupancyGrid,
    bus: Arc<dyn BusAdapter>,
    events: EventSender,
    clock: Arc<dyn Clock>,

    state: EngineState,
    paused: bool,
    waiting_for_arrival: bool,
    preparing_next_goal: bool,

    start_pos: Option<Vec3>,
    current_pos: Option<Vec3>,
    current_goal: Option<Goal>,
    current_mission_id: Option<String>,
    pending_start: Option<PendingStart>,
    pending_stop_reason: Option<StopReason>,

    start_time: Option<Duration>,
    mission_start_time: Option<Duration>,
    last_update_time: Option<Duration>,
    first_tick_due: Option<Duration>,
    last_status_time: Option<Duration>,

    last_goal_direction: Option<[f64; 2]>,
    last_velocity_check: Option<(Vec3, Duration)>,
    stuck_since: Option<Duration>,

    goal_attempts: HashMap<GoalKey, u32>,
    unreachable_goals: Vec<UnreachableRecord>,
    visited_goals: Vec<VisitedGoal>,
    scene_bounds: Option<(Vec3, Vec3)>,
    last_frontier_count: usize,
}

impl ExplorationController {
    pub fn new(
        config: ExplorationConfig,
        bus: Arc<dyn BusAdapter>,
        events: EventSender,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let grid = OccupancyGrid::new(
            config.grid_width,
            config.grid_height,
            config.resolution,
            config.robot_radius,
        );

        Self {
            config,
            grid,
            bus,
            events,
            clock,
            state: EngineState::Idle,
            paused: false,
            waiting_for_arrival: false,
            preparing_next_goal: false,
            start_pos: None,
            current_pos: None,
            current_goal: None,
            current_mission_id: None,
            pending_start: None,
            pending_stop_reason: None,
            start_time: None,
            mission_start_time: None,
            last_update_time: None,
            first_tick_due: None,
            last_status_time: None,
            last_goal_direction: None,
            last_velocity_check: None,
            stuck_since: None,
            goal_attempts: HashMap::new(),
            unreachable_goals: Vec::new(),
            visited_goals: Vec::new(),
            scene_bounds: None,
            last_frontier_count: 0,
        }
    }

    // ========================================================================
    // Control surface
    // ========================================================================

    /// Begin a new exploration session.
    pub fn start_exploration(&mut self, opts: StartOptions) -> Result<()> {
        match self.state {
            EngineState::Exploring => {
                return Err(ExploreError::Precondition("already exploring".into()));
            }
            EngineState::ReturningHome => {
                return Err(ExploreError::Precondition("still returning home".into()));
            }
            EngineState::Idle | EngineState::Stopped => {}
        }

        let position = opts.start_position.or(self.current_pos).ok_or_else(|| {
            ExploreError::Precondition("no known vehicle position".into())
        })?;

        self.config.apply_start_options(&opts);

        let now = self.clock.now();

        // Fresh session bookkeeping
        self.grid.reset();
        self.goal_attempts.clear();
        self.unreachable_goals.clear();
        self.visited_goals.clear();
        self.scene_bounds = None;
        self.current_goal = None;
        self.current_mission_id = None;
        self.pending_start = None;
        self.pending_stop_reason = None;
        self.last_goal_direction = None;
        self.last_velocity_check = None;
        self.stuck_since = None;
        self.mission_start_time = None;
        self.last_update_time = None;
        self.last_frontier_count = 0;

        // Seed a free disk around the start; without it there is no
        // free/unknown boundary and the first detection finds nothing
        let center = self.grid.world_to_grid(position.x, position.y);
        self.grid.free_disk(center, self.config.seed_radius_cells);
        self.grid.inflate_obstacles();

        self.start_pos = Some(position);
        self.current_pos = Some(position);
        self.start_time = Some(now);
        self.first_tick_due = Some(now + FIRST_TICK_DELAY);
        self.last_status_time = Some(now);

        self.state = EngineState::Exploring;
        self.paused = false;
        self.waiting_for_arrival = false;
        self.preparing_next_goal = false;

        log::info!(
            "exploration started at ({:.2}, {:.2}, {:.2})",
            position.x,
            position.y,
            position.z
        );
        self.emit(EngineEvent::Started { position });
        Ok(())
    }

    /// Pause planning; map updates continue.
    pub fn pause_exploration(&mut self) -> Result<()> {
        if self.state != EngineState::Exploring {
            return Err(ExploreError::Precondition("not exploring".into()));
        }
        if !self.paused {
            self.paused = true;
            log::info!("exploration paused");
            self.emit(EngineEvent::Paused);
        }
        Ok(())
    }

    /// Resume planning; the next cloud event may tick immediately.
    pub fn resume_exploration(&mut self) -> Result<()> {
        if self.state != EngineState::Exploring {
            return Err(ExploreError::Precondition("not exploring".into()));
        }
        if self.paused {
            self.paused = false;
            self.last_update_time = None;
            log::info!("exploration resumed");
            self.emit(EngineEvent::Resumed);
        }
        Ok(())
    }

    /// Stop the current session; returns home when far from the start.
    pub fn stop_exploration(&mut self) -> Result<()> {
        match self.state {
            EngineState::Exploring => {
                self.stop_with_reason(StopReason::Manual);
                Ok(())
            }
            _ => Err(ExploreError::Precondition("not exploring".into())),
        }
    }

    /// Stop everything and return to Idle, clearing the map and history.
    pub fn reset(&mut self) {
        if self.state == EngineState::Exploring {
            self.stop_with_reason(StopReason::Manual);
        }
        self.grid.reset();
        self.state = EngineState::Idle;
        self.paused = false;
        self.waiting_for_arrival = false;
        self.preparing_next_goal = false;
        self.start_pos = None;
        self.current_goal = None;
        self.current_mission_id = None;
        self.pending_start = None;
        self.pending_stop_reason = None;
        self.start_time = None;
        self.mission_start_time = None;
        self.last_update_time = None;
        self.first_tick_due = None;
        self.last_goal_direction = None;
        self.last_velocity_check = None;
        self.stuck_since = None;
        self.goal_attempts.clear();
        self.unreachable_goals.clear();
        self.visited_goals.clear();
        self.scene_bounds = None;
        self.last_frontier_count = 0;
        log::info!("exploration engine reset");
    }

    /// Restrict goal selection to a polygon.
    pub fn set_roi(&mut self, polygon: Vec<[f64; 2]>) -> Result<()> {
        if polygon.len() < 3 {
            return Err(ExploreError::Config(
                "ROI polygon needs at least 3 vertices".into(),
            ));
        }
        log::info!("ROI set with {} vertices", polygon.len());
        self.config.roi_polygon = Some(polygon);
        self.config.use_roi = true;
        Ok(())
    }

    /// Remove the ROI restriction.
    pub fn clear_roi(&mut self) {
        self.config.roi_polygon = None;
        self.config.use_roi = false;
    }

    /// Replace the scoring weights after range validation.
    pub fn set_scoring_weights(&mut self, weights: ScoringWeights) -> Result<()> {
        weights.validate()?;
        self.config.weights = weights;
        Ok(())
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        self.config.weights
    }

    /// Snapshot the map for the gateway.
    pub fn map_data(&self) -> MapData {
        self.grid.export()
    }

    /// Current progress telemetry.
    pub fn status(&self) -> StatusReport {
        let now = self.clock.now();
        let elapsed = match (self.state, self.start_time) {
            (EngineState::Exploring | EngineState::ReturningHome, Some(t)) => {
                now.saturating_sub(t).as_secs_f64()
            }
            _ => 0.0,
        };
        let distance_from_start = match (self.current_pos, self.start_pos) {
            (Some(pos), Some(start)) => pos.distance_xy(&start),
            _ => 0.0,
        };
        let total_cells = (self.grid.width() * self.grid.height()) as f64;
        let counts = self.grid.counts();
        let explored_percentage =
            (counts.free + counts.occupied) as f64 / total_cells * 100.0;

        StatusReport {
            is_exploring: self.state == EngineState::Exploring,
            is_paused: self.paused,
            is_returning_home: self.state == EngineState::ReturningHome,
            is_waiting_for_arrival: self.waiting_for_arrival,
            frontiers_count: self.last_frontier_count,
            explored_area_m2: self.grid.explored_area(),
            explored_percentage,
            elapsed_secs: elapsed,
            distance_from_start,
            current_goal: self.current_goal,
            map_counts: counts,
        }
    }

    // ========================================================================
    // Event handlers
    // ========================================================================

    /// Ingest a point cloud; may run a planning tick.
    pub fn handle_point_cloud(&mut self, cloud: &PointCloud) {
        let now = self.clock.now();
        self.flush_pending_start(now);

        if let Some(position) = self.current_pos {
            self.update_map(cloud, position);
        }

        if self.state == EngineState::Exploring && !self.paused {
            if self.waiting_for_arrival && !self.preparing_next_goal {
                // Not planning; but give up on the goal if it is overdue
                let overdue = self.mission_start_time.is_some_and(|t| {
                    now.saturating_sub(t).as_secs_f64() > self.config.arrival_timeout_secs
                });
                if overdue {
                    log::warn!("arrival timeout, recording failed attempt");
                    self.record_failed_attempt();
                }
            } else if self.tick_due(now) {
                self.planning_step(now);
            }
        }

        self.emit_status_if_due(now);
    }

    /// Ingest vehicle odometry; drives arrival, stuck, and return checks.
    ///
    /// Events without a resolvable position are ignored.
    pub fn handle_odometry(&mut self, odometry: &Odometry) {
        let Some(position) = odometry.canonical_position() else {
            log::debug!("ignoring odometry without position");
            return;
        };

        let now = self.clock.now();
        self.current_pos = Some(position);
        self.flush_pending_start(now);

        match self.state {
            EngineState::ReturningHome => {
                if let Some(start) = self.start_pos {
                    if position.distance_xy(&start) < RETURN_HOME_RADIUS {
                        log::info!("returned to start position");
                        self.state = EngineState::Stopped;
                        self.emit(EngineEvent::Returned);
                        if let Some(reason) = self.pending_stop_reason.take() {
                            self.emit(EngineEvent::Stopped { reason });
                        }
                    }
                }
            }
            EngineState::Exploring => {
                if self.waiting_for_arrival {
                    self.check_stuck(position, now);
                }
                // Stuck handling may have cleared the wait
                if self.waiting_for_arrival {
                    self.check_arrival(position);
                }
                self.last_velocity_check = Some((position, now));
            }
            EngineState::Idle | EngineState::Stopped => {}
        }

        self.emit_status_if_due(now);
    }

    // ========================================================================
    // Map update
    // ========================================================================

    /// Project a cloud into the grid and refresh the inflated layer.
    fn update_map(&mut self, cloud: &PointCloud, position: Vec3) {
        if self.scene_bounds.is_none() && cloud.points.len() >= SCENE_BOUNDS_MIN_POINTS {
            self.derive_scene_bounds(cloud);
        }

        if cloud.points.is_empty() {
            return;
        }

        let origin = self.grid.world_to_grid(position.x, position.y);
        let mut traced = 0usize;

        for point in cloud.points.iter().step_by(self.config.cloud_stride.max(1)) {
            // Only near-plane returns project into the 2D map
            if (point.z - position.z).abs() > self.config.projection_band {
                continue;
            }
            let end = self.grid.world_to_grid(point.x, point.y);
            if !self.grid.in_map(end) {
                continue;
            }
            self.grid.raytrace(origin, end);
            self.grid.set(end, akash_map::CellState::Occupied);
            traced += 1;
        }

        if traced > 0 {
            self.grid.inflate_obstacles();
        }
    }

    /// Derive the scene bounding box from the first substantial cloud.
    fn derive_scene_bounds(&mut self, cloud: &PointCloud) {
        let mut min = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &cloud.points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        let bounded_min = Vec3::new(
            min.x + SCENE_BOUNDS_MARGIN,
            min.y + SCENE_BOUNDS_MARGIN,
            (min.z + 0.3).max(0.5),
        );
        let bounded_max = Vec3::new(
            max.x - SCENE_BOUNDS_MARGIN,
            max.y - SCENE_BOUNDS_MARGIN,
            (max.z - 0.5).min(2.5),
        );

        if bounded_min.x >= bounded_max.x || bounded_min.y >= bounded_max.y {
            log::warn!("scene too small for bounds derivation, skipping");
            return;
        }

        log::info!(
            "scene bounds derived: ({:.1}, {:.1})..({:.1}, {:.1})",
            bounded_min.x,
            bounded_min.y,
            bounded_max.x,
            bounded_max.y
        );
        self.scene_bounds = Some((bounded_min, bounded_max));
    }

    // ========================================================================
    // Planning
    // ========================================================================

    fn tick_due(&self, now: Duration) -> bool {
        if self.first_tick_due.is_some_and(|due| now < due) {
            return false;
        }
        match self.last_update_time {
            Some(last) => {
                now.saturating_sub(last) >= Duration::from_millis(self.config.update_interval_ms)
            }
            None => true,
        }
    }

    /// One receding-horizon planning tick.
    fn planning_step(&mut self, now: Duration) {
        let Some(position) = self.current_pos else {
            return;
        };
        let Some(start) = self.start_pos else {
            return;
        };

        // Budgets first
        let elapsed = self
            .start_time
            .map(|t| now.saturating_sub(t).as_secs_f64())
            .unwrap_or(0.0);
        if elapsed > self.config.max_duration_secs {
            log::info!("duration budget exhausted after {:.0}s", elapsed);
            self.stop_with_reason(StopReason::Timeout);
            return;
        }
        if position.distance_xy(&start) > self.config.max_distance {
            log::info!("distance budget exhausted");
            self.stop_with_reason(StopReason::MaxDistance);
            return;
        }

        self.last_update_time = Some(now);

        let detector =
            FrontierDetector::new(self.config.cluster_radius, self.config.min_cluster_size);
        let frontiers = detector.detect(&self.grid, position, self.config.max_distance);
        self.last_frontier_count = frontiers.len();

        if frontiers.is_empty() {
            log::info!("no frontiers remain, exploration complete");
            self.stop_with_reason(StopReason::Complete);
            return;
        }

        let ctx = ScoreContext {
            grid: &self.grid,
            position,
            unreachable: &self.unreachable_goals,
            visited: &self.visited_goals,
            last_direction: self.last_goal_direction,
            scene_bounds: self.scene_bounds,
        };
        let selected = GoalScorer::new(&self.config).select(&frontiers, &ctx);

        let Some(goal) = selected else {
            log::info!("{} frontiers but none selectable", frontiers.len());
            self.stop_with_reason(StopReason::NoValidFrontier);
            return;
        };

        let distance = (goal.x - position.x).hypot(goal.y - position.y);
        if distance > f64::EPSILON {
            self.last_goal_direction =
                Some([(goal.x - position.x) / distance, (goal.y - position.y) / distance]);
        }

        self.current_goal = Some(goal);
        self.waiting_for_arrival = true;
        self.preparing_next_goal = false;
        self.mission_start_time = Some(now);
        self.stuck_since = None;

        let mission =
            exploration_mission(position, &goal, self.config.waypoint_spacing, now);
        log::info!(
            "mission {} -> ({:.2}, {:.2}, {:.2}), {} waypoints",
            mission.id,
            goal.x,
            goal.y,
            goal.z,
            mission.tasks.len()
        );
        self.publish_mission(mission, now);

        self.emit(EngineEvent::Status(self.status()));
        self.last_status_time = Some(now);
    }

    // ========================================================================
    // Arrival, stuck, and failure handling
    // ========================================================================

    fn check_arrival(&mut self, position: Vec3) {
        let Some(goal) = self.current_goal else {
            return;
        };
        let distance = (goal.x - position.x).hypot(goal.y - position.y);

        if distance < self.config.arrival_radius {
            log::info!("arrived at goal ({:.2}, {:.2})", goal.x, goal.y);
            self.visited_goals.push(VisitedGoal { x: goal.x, y: goal.y });
            self.goal_attempts.remove(&goal_key(goal.x, goal.y));
            self.current_goal = None;
            self.waiting_for_arrival = false;
            self.preparing_next_goal = false;
            self.stuck_since = None;
            self.mission_start_time = None;
        } else if distance < self.config.replan_horizon {
            // Receding horizon: close enough that the next tick may plan
            // without waiting for formal arrival
            self.preparing_next_goal = true;
        }
    }

    /// Velocity-based stuck detection between consecutive pose events.
    fn check_stuck(&mut self, position: Vec3, now: Duration) {
        let Some((last_pos, last_time)) = self.last_velocity_check else {
            return;
        };
        let dt = now.saturating_sub(last_time).as_secs_f64();
        if dt <= 0.0 {
            return;
        }

        let velocity = position.distance_xy(&last_pos) / dt;
        if velocity < self.config.stuck_velocity {
            let since = *self.stuck_since.get_or_insert(now);
            if now.saturating_sub(since).as_secs_f64() >= self.config.stuck_timeout_secs {
                log::warn!(
                    "stuck: {:.3} m/s for {:.1}s, abandoning goal",
                    velocity,
                    now.saturating_sub(since).as_secs_f64()
                );
                self.record_failed_attempt();
            }
        } else {
            self.stuck_since = None;
        }
    }

    /// Count a failed attempt on the current goal, blacklisting it once the
    /// attempt budget is spent. Clears the wait either way so the next tick
    /// replans.
    fn record_failed_attempt(&mut self) {
        if let Some(goal) = self.current_goal {
            let key = goal_key(goal.x, goal.y);
            let attempts = self.goal_attempts.entry(key).or_insert(0);
            *attempts += 1;
            log::info!(
                "goal ({:.2}, {:.2}) attempt {}/{}",
                goal.x,
                goal.y,
                attempts,
                self.config.max_goal_attempts
            );
            if *attempts >= self.config.max_goal_attempts {
                log::warn!("goal ({:.2}, {:.2}) blacklisted", goal.x, goal.y);
                self.unreachable_goals
                    .push(UnreachableRecord { x: goal.x, y: goal.y });
                self.goal_attempts.remove(&key);
            }
        }
        self.current_goal = None;
        self.current_mission_id = None;
        self.waiting_for_arrival = false;
        self.preparing_next_goal = false;
        self.stuck_since = None;
        self.mission_start_time = None;
    }

    // ========================================================================
    // Stopping
    // ========================================================================

    fn stop_with_reason(&mut self, reason: StopReason) {
        log::info!("stopping exploration: {}", reason.as_str());
        self.paused = false;
        self.waiting_for_arrival = false;
        self.preparing_next_goal = false;
        self.current_goal = None;
        self.stuck_since = None;
        self.mission_start_time = None;

        let now = self.clock.now();
        let far_from_home = match (self.current_pos, self.start_pos) {
            (Some(pos), Some(start)) => pos.distance_xy(&start) > RETURN_HOME_MIN_DISTANCE,
            _ => false,
        };

        if far_from_home {
            // A mission may still be in flight on the vehicle; stop it
            // before the return-home mission supersedes it
            if let Some(id) = self.current_mission_id.take() {
                self.publish_execution(ExecutionCommand {
                    id,
                    action: ExecutionAction::Stop,
                });
            }

            let home = self.start_pos.unwrap_or(Vec3::ZERO);
            let mission = return_home_mission(home, now);
            log::info!("returning home via {}", mission.id);
            self.publish_mission(mission, now);

            self.state = EngineState::ReturningHome;
            self.pending_stop_reason = Some(reason);
        } else {
            self.state = EngineState::Stopped;
            self.current_mission_id = None;
            self.emit(EngineEvent::Stopped { reason });
        }
    }

    // ========================================================================
    // Bus and event plumbing
    // ========================================================================

    fn publish_mission(&mut self, mission: Mission, now: Duration) {
        if let Err(e) = self.bus.publish_mission(&mission) {
            log::warn!("mission publish failed: {}", e);
        }
        self.pending_start = Some(PendingStart {
            mission_id: mission.id.clone(),
            due: now + Duration::from_millis(self.config.start_command_delay_ms),
        });
        self.current_mission_id = Some(mission.id);
    }

    fn publish_execution(&self, command: ExecutionCommand) {
        if let Err(e) = self.bus.publish_execution(&command) {
            log::warn!("execution publish failed: {}", e);
        }
    }

    /// Publish the deferred START once its delay has elapsed. Ordering
    /// guarantee: the START for mission M always trails M's envelope.
    fn flush_pending_start(&mut self, now: Duration) {
        let due = self
            .pending_start
            .as_ref()
            .is_some_and(|pending| now >= pending.due);
        if due {
            if let Some(pending) = self.pending_start.take() {
                self.publish_execution(ExecutionCommand {
                    id: pending.mission_id,
                    action: ExecutionAction::Start,
                });
            }
        }
    }

    fn emit_status_if_due(&mut self, now: Duration) {
        if self.state != EngineState::Exploring {
            return;
        }
        let due = self.last_status_time.map_or(true, |last| {
            now.saturating_sub(last).as_secs_f64() >= self.config.status_interval_secs
        });
        if due {
            self.emit(EngineEvent::Status(self.status()));
            self.last_status_time = Some(now);
        }
    }

    fn emit(&self, event: EngineEvent) {
        // A dropped receiver only means nobody is listening
        self.events.send(event).ok();
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_exploring(&self) -> bool {
        self.state == EngineState::Exploring
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_returning_home(&self) -> bool {
        self.state == EngineState::ReturningHome
    }

    pub fn is_waiting_for_arrival(&self) -> bool {
        self.waiting_for_arrival
    }

    pub fn is_preparing_next_goal(&self) -> bool {
        self.preparing_next_goal
    }

    pub fn current_goal(&self) -> Option<Goal> {
        self.current_goal
    }

    pub fn current_mission_id(&self) -> Option<&str> {
        self.current_mission_id.as_deref()
    }

    pub fn visited_goals(&self) -> &[VisitedGoal] {
        &self.visited_goals
    }

    pub fn unreachable_goals(&self) -> &[UnreachableRecord] {
        &self.unreachable_goals
    }

    pub fn goal_attempts(&self) -> &HashMap<GoalKey, u32> {
        &self.goal_attempts
    }

    pub fn explored_area(&self) -> f64 {
        self.grid.explored_area()
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::event_channel;
    use std::sync::Mutex;

    #[derive(Default)]
    struct NullBus {
        missions: Mutex<Vec<Mission>>,
    }

    impl BusAdapter for NullBus {
        fn publish_mission(&self, mission: &Mission) -> Result<()> {
            self.missions.lock().unwrap().push(mission.clone());
            Ok(())
        }

        fn publish_execution(&self, _command: &ExecutionCommand) -> Result<()> {
            Ok(())
        }
    }

    fn controller() -> (ExplorationController, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let (tx, _rx) = event_channel();
        let controller = ExplorationController::new(
            ExplorationConfig::default(),
            Arc::new(NullBus::default()),
            tx,
            clock.clone(),
        );
        (controller, clock)
    }

    fn start_opts() -> StartOptions {
        StartOptions {
            start_position: Some(Vec3::new(0.0, 0.0, 1.0)),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_requires_position() {
        let (mut c, _clock) = controller();
        assert!(c.start_exploration(StartOptions::default()).is_err());
        assert!(c.start_exploration(start_opts()).is_ok());
    }

    #[test]
    fn test_start_twice_fails() {
        let (mut c, _clock) = controller();
        c.start_exploration(start_opts()).unwrap();
        assert!(c.start_exploration(start_opts()).is_err());
    }

    #[test]
    fn test_pause_resume() {
        let (mut c, _clock) = controller();
        assert!(c.pause_exploration().is_err());

        c.start_exploration(start_opts()).unwrap();
        c.pause_exploration().unwrap();
        assert!(c.is_paused());
        c.resume_exploration().unwrap();
        assert!(!c.is_paused());
    }

    #[test]
    fn test_seed_disk_on_start() {
        let (mut c, _clock) = controller();
        c.start_exploration(start_opts()).unwrap();
        // 709 cells at 0.2 m resolution
        assert!((c.explored_area() - 28.36).abs() < 0.01);
    }

    #[test]
    fn test_malformed_odometry_ignored() {
        let (mut c, _clock) = controller();
        c.start_exploration(start_opts()).unwrap();
        c.handle_odometry(&Odometry::default());
        // Position unchanged from the start option
        assert_eq!(c.status().distance_from_start, 0.0);
    }

    #[test]
    fn test_stop_near_home_skips_return() {
        let (mut c, _clock) = controller();
        c.start_exploration(start_opts()).unwrap();
        c.stop_exploration().unwrap();
        assert_eq!(c.state(), EngineState::Stopped);
        assert!(!c.is_returning_home());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let (mut c, _clock) = controller();
        c.start_exploration(start_opts()).unwrap();
        c.reset();
        assert_eq!(c.state(), EngineState::Idle);
        assert_eq!(c.explored_area(), 0.0);
        assert!(c.visited_goals().is_empty());
    }

    #[test]
    fn test_set_roi_validation() {
        let (mut c, _clock) = controller();
        assert!(c.set_roi(vec![[0.0, 0.0], [1.0, 0.0]]).is_err());
        assert!(c
            .set_roi(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]])
            .is_ok());
        c.clear_roi();
    }

    #[test]
    fn test_weight_setter_validates() {
        let (mut c, _clock) = controller();
        let mut weights = ScoringWeights::default();
        weights.history = 2.0;
        assert!(c.set_scoring_weights(weights).is_err());

        weights.history = 0.8;
        assert!(c.set_scoring_weights(weights).is_ok());
        assert_eq!(c.scoring_weights().history, 0.8);
    }

    #[test]
    fn test_first_tick_waits_500ms() {
        let (mut c, clock) = controller();
        c.start_exploration(start_opts()).unwrap();

        // Before the first-tick delay nothing plans
        clock.advance(Duration::from_millis(200));
        c.handle_point_cloud(&PointCloud::default());
        assert!(!c.is_waiting_for_arrival());

        // After it, the tick runs and publishes a mission
        clock.advance(Duration::from_millis(400));
        c.handle_point_cloud(&PointCloud::default());
        assert!(c.is_waiting_for_arrival());
        assert!(c.current_goal().is_some());
    }
}
