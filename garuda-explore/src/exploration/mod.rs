//! Autonomous exploration: frontier detection, goal scoring, mission
//! synthesis, and the controller state machine tying them together.

pub mod controller;
pub mod frontier;
pub mod mission;
pub mod scorer;

pub use controller::{EngineState, ExplorationController};
pub use frontier::{Frontier, FrontierDetector};
pub use scorer::{Goal, GoalScorer, ScoreContext, UnreachableRecord, VisitedGoal};
