//! Bus adapter contract and wire payload types.
//!
//! The engine talks to the vehicle exclusively through [`BusAdapter`]; the
//! transport behind it (MQTT, a simulator, a test recorder) and the binary
//! envelope encoding are the adapter's concern. Payload types here carry
//! the serde shapes of the surrounding mission contracts.

use crate::error::Result;
use akash_map::Vec3;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// One sample of a streamed point cloud, in the world frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
}

/// A streamed point cloud event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointCloud {
    #[serde(default)]
    pub points: Vec<CloudPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp_us: Option<u64>,
}

/// Nested pose as published by some vehicle firmwares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdometryPose {
    #[serde(default)]
    pub position: Option<Vec3>,
}

/// Vehicle odometry event.
///
/// Real vehicles and the simulator disagree on shape: position arrives
/// either at the top level or nested under `pose.position`. Both are
/// accepted; [`canonical_position`](Odometry::canonical_position) resolves
/// to a single `Vec3`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Odometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<OdometryPose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec3>,
}

impl Odometry {
    /// Create an odometry event from a bare position.
    pub fn at(position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    /// The canonical position, wherever it was carried.
    ///
    /// `None` means the event is malformed and should be ignored.
    pub fn canonical_position(&self) -> Option<Vec3> {
        self.position
            .or_else(|| self.pose.as_ref().and_then(|p| p.position))
    }
}

/// Autopilot payload of a single mission task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPilotTask {
    pub position: Vec3,
    pub yaw: f64,
    /// Present in the surrounding mission contracts; the engine never sets
    /// a velocity policy, so this stays `None` here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// One waypoint task of a mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionTask {
    pub auto_pilot: AutoPilotTask,
}

/// A waypoint mission envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub tasks: Vec<MissionTask>,
}

/// Mission execution actions, serialized as their wire integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionAction {
    Start,
    Pause,
    Resume,
    Stop,
    Clear,
}

impl ExecutionAction {
    pub fn as_u8(&self) -> u8 {
        match self {
            ExecutionAction::Start => 0,
            ExecutionAction::Pause => 1,
            ExecutionAction::Resume => 2,
            ExecutionAction::Stop => 3,
            ExecutionAction::Clear => 4,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ExecutionAction::Start),
            1 => Some(ExecutionAction::Pause),
            2 => Some(ExecutionAction::Resume),
            3 => Some(ExecutionAction::Stop),
            4 => Some(ExecutionAction::Clear),
            _ => None,
        }
    }
}

impl Serialize for ExecutionAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ExecutionAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        ExecutionAction::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid execution action {}", value)))
    }
}

/// Execution command bound to a mission id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCommand {
    pub id: String,
    pub action: ExecutionAction,
}

/// Boundary through which the engine publishes to the vehicle.
///
/// Implementations own transport retries; the engine logs publish failures
/// and moves on.
pub trait BusAdapter: Send + Sync {
    fn publish_mission(&self, mission: &Mission) -> Result<()>;
    fn publish_execution(&self, command: &ExecutionCommand) -> Result<()>;
}
