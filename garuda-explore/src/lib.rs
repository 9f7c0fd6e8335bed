//! GarudaExplore - autonomous exploration engine for an indoor aerial
//! vehicle ground control station.
//!
//! A real-time feedback loop that ingests streaming point clouds and
//! vehicle pose, maintains a 2D occupancy grid with obstacle inflation,
//! detects and clusters frontiers, scores the next goal, and issues
//! waypoint missions over a message bus. Progress is guaranteed through
//! arrival timeouts, velocity-based stuck detection, unreachable-goal
//! blacklisting, and an autonomous return-to-home.
//!
//! ## Architecture
//!
//! The engine is a single-threaded cooperative event loop. The embedding
//! process (gateway, simulator, or test harness) delivers pose and cloud
//! events plus control calls on one loop; no handler blocks:
//!
//! - **Cloud event**: updates the map, then runs a time-throttled planning
//!   tick when not waiting for arrival
//! - **Pose event**: drives arrival detection, stuck detection, and
//!   return-home completion
//! - **Control calls**: start/pause/resume/stop/reset, ROI and scoring
//!   weight setters
//!
//! Outbound traffic goes through a [`bus::BusAdapter`] (missions,
//! execution commands) and an [`events`] channel (lifecycle and status
//! events). Time is injected through [`clock::Clock`] so tests drive every
//! timeout deterministically.

pub mod bus;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod exploration;

pub use bus::{BusAdapter, ExecutionAction, ExecutionCommand, Mission, Odometry, PointCloud};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ExplorationConfig, ScoringWeights, StartOptions};
pub use error::{ExploreError, Result};
pub use events::{event_channel, EngineEvent, EventReceiver, EventSender, StatusReport, StopReason};
pub use exploration::{EngineState, ExplorationController, Frontier, FrontierDetector, Goal};
