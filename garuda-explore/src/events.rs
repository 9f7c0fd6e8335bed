//! Engine events published to the surrounding GCS layers.
//!
//! The controller emits a tagged union over a channel instead of holding
//! listener callbacks; the gateway drains the receiver and fans out to its
//! WebSocket clients.

use crate::exploration::Goal;
use akash_map::{CellCounts, Vec3};
use serde::Serialize;

/// Why an exploration session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stopped by an external control call.
    Manual,
    /// Session exceeded its duration budget.
    Timeout,
    /// Vehicle strayed beyond the distance budget.
    MaxDistance,
    /// No frontiers remain; the reachable map is closed.
    Complete,
    /// Frontiers remain but none passed the goal filters.
    NoValidFrontier,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Manual => "manual",
            StopReason::Timeout => "timeout",
            StopReason::MaxDistance => "max_distance",
            StopReason::Complete => "complete",
            StopReason::NoValidFrontier => "no_valid_frontier",
        }
    }
}

/// Periodic progress telemetry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_exploring: bool,
    pub is_paused: bool,
    pub is_returning_home: bool,
    pub is_waiting_for_arrival: bool,
    pub frontiers_count: usize,
    pub explored_area_m2: f64,
    pub explored_percentage: f64,
    pub elapsed_secs: f64,
    pub distance_from_start: f64,
    pub current_goal: Option<Goal>,
    pub map_counts: CellCounts,
}

/// Events emitted by the exploration controller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Started { position: Vec3 },
    Paused,
    Resumed,
    Stopped { reason: StopReason },
    Returned,
    Status(StatusReport),
}

/// Sender end of the event channel (held by the controller).
pub type EventSender = crossbeam_channel::Sender<EngineEvent>;

/// Receiver end of the event channel (held by the gateway).
pub type EventReceiver = crossbeam_channel::Receiver<EngineEvent>;

/// Create a new event channel pair.
pub fn event_channel() -> (EventSender, EventReceiver) {
    crossbeam_channel::unbounded()
}
