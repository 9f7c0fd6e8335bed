//! Mission synthesis.
//!
//! Goals become linearly interpolated waypoint missions; return-to-home is
//! a single-waypoint mission. Mission ids embed monotonic milliseconds so
//! receipts and execution commands can be correlated without extra state.

use std::time::Duration;

use akash_map::Vec3;

use crate::bus::{AutoPilotTask, Mission, MissionTask};
use crate::exploration::scorer::Goal;

/// Build an exploration mission from the current position to a goal.
///
/// Waypoints are spaced every `spacing` meters of xy distance, endpoints
/// included, never fewer than two.
pub fn exploration_mission(from: Vec3, goal: &Goal, spacing: f64, now: Duration) -> Mission {
    let target = Vec3::new(goal.x, goal.y, goal.z);
    Mission {
        id: format!("exploration_{}", now.as_millis()),
        tasks: interpolate(from, target, spacing)
            .into_iter()
            .map(task_at)
            .collect(),
    }
}

/// Build a single-waypoint return-to-home mission.
pub fn return_home_mission(home: Vec3, now: Duration) -> Mission {
    Mission {
        id: format!("return_home_{}", now.as_millis()),
        tasks: vec![task_at(home)],
    }
}

fn task_at(position: Vec3) -> MissionTask {
    MissionTask {
        auto_pilot: AutoPilotTask {
            position,
            yaw: 0.0,
            speed: None,
        },
    }
}

/// Interpolate waypoints from `from` to `to`, one every `spacing` meters
/// along the xy distance, with at least two points.
fn interpolate(from: Vec3, to: Vec3, spacing: f64) -> Vec<Vec3> {
    let distance = from.distance_xy(&to);
    let steps = if spacing > 0.0 {
        ((distance / spacing).ceil() as usize).max(1)
    } else {
        1
    };

    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            Vec3::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
                from.z + (to.z - from.z) * t,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn goal(x: f64, y: f64, z: f64) -> Goal {
        Goal {
            x,
            y,
            z,
            density: 0.0,
            path_clear: true,
        }
    }

    #[test]
    fn test_waypoints_spaced_and_bounded() {
        let mission = exploration_mission(
            Vec3::new(0.0, 0.0, 1.0),
            &goal(7.0, 0.0, 1.0),
            2.0,
            Duration::from_millis(1234),
        );

        // ceil(7 / 2) = 4 segments, 5 waypoints
        assert_eq!(mission.tasks.len(), 5);
        assert_eq!(mission.id, "exploration_1234");

        let first = mission.tasks.first().unwrap().auto_pilot.position;
        let last = mission.tasks.last().unwrap().auto_pilot.position;
        assert_relative_eq!(first.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(last.x, 7.0, epsilon = 1e-12);

        // Consecutive spacing never exceeds the requested spacing
        for pair in mission.tasks.windows(2) {
            let a = pair[0].auto_pilot.position;
            let b = pair[1].auto_pilot.position;
            assert!(a.distance_xy(&b) <= 2.0 + 1e-9);
        }
    }

    #[test]
    fn test_short_hop_still_two_waypoints() {
        let mission = exploration_mission(
            Vec3::new(0.0, 0.0, 1.0),
            &goal(0.6, 0.0, 1.0),
            2.0,
            Duration::from_millis(1),
        );
        assert_eq!(mission.tasks.len(), 2);
    }

    #[test]
    fn test_altitude_interpolates() {
        let mission = exploration_mission(
            Vec3::new(0.0, 0.0, 1.0),
            &goal(4.0, 0.0, 2.0),
            2.0,
            Duration::from_millis(1),
        );
        let mid = mission.tasks[1].auto_pilot.position;
        assert_relative_eq!(mid.z, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_return_home_single_waypoint() {
        let mission = return_home_mission(Vec3::new(0.5, -0.5, 1.0), Duration::from_secs(9));
        assert_eq!(mission.id, "return_home_9000");
        assert_eq!(mission.tasks.len(), 1);
        assert_relative_eq!(mission.tasks[0].auto_pilot.position.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_yaw_is_zero() {
        let mission = exploration_mission(
            Vec3::ZERO,
            &goal(3.0, 3.0, 1.0),
            2.0,
            Duration::from_millis(1),
        );
        assert!(mission.tasks.iter().all(|t| t.auto_pilot.yaw == 0.0));
    }
}
