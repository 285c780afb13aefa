//! Behavior models: the planners that decide how each agent moves.
//!
//! Every agent owns a [`BehaviorModel`]. At each world step the model gets
//! an [`ObservedWorld`] (the world as seen by that agent) and returns a
//! short [`Trajectory`] starting at the agent's current state. The
//! execution model then samples the trajectory at the next world time.
//!
//! The rule-based planners layer on top of each other:
//!
//! ```text
//! BehaviorIntersectionRuleBased   predicts crossing traffic, brakes for it
//!   └─ BehaviorSimpleRuleBased    lane-change decision hook
//!        └─ BehaviorIDMLaneTracking   IDM + Stanley steering
//!             └─ IdmCore              IDM acceleration, leader search
//! ```

mod constant_velocity;
mod idm;
mod rule_based;

pub use constant_velocity::BehaviorConstantVelocity;
pub use idm::{BehaviorIDMClassic, BehaviorIDMLaneTracking, IdmCore, IdmParameters, RelativeValues};
pub use rule_based::{
    BehaviorIntersectionRuleBased, BehaviorSimpleRuleBased, IntersectionParameters, LaneChangeDecision,
};

use crate::dynamic::{make_state, Input, State, StateDefinition, Trajectory};
use crate::geometry::Line;
use crate::params::ParameterServer;
use crate::world::ObservedWorld;
use nalgebra::DMatrix;
use thiserror::Error;

/// The action a planner committed to: the control input of the first step.
pub type Action = Input;

/// Errors raised when building behavior models.
#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("Unknown behavior model: {0}")]
    UnknownModel(String),
}

/// Outcome of the most recent `plan` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BehaviorStatus {
    /// No plan was produced yet
    #[default]
    NotValid,
    /// The last plan is usable
    Valid,
}

/// A planner that maps an observed world to a trajectory.
pub trait BehaviorModel: Send {
    /// Plans `delta_time` seconds ahead from the ego's current state.
    fn plan(&mut self, delta_time: f64, observed_world: &ObservedWorld) -> Trajectory;

    /// Trajectory returned by the last `plan` call (empty before the first).
    fn last_trajectory(&self) -> &Trajectory;

    /// Action chosen by the last `plan` call.
    fn last_action(&self) -> Action;

    fn status(&self) -> BehaviorStatus;

    /// Type name, as accepted by [`behavior_from_name`].
    fn name(&self) -> &'static str;

    fn clone_box(&self) -> Box<dyn BehaviorModel>;
}

impl Clone for Box<dyn BehaviorModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn BehaviorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?})", self.name(), self.status())
    }
}

/// Bookkeeping shared by all planners.
#[derive(Debug, Clone)]
pub(crate) struct PlanRecord {
    pub last_trajectory: Trajectory,
    pub last_action: Action,
    pub status: BehaviorStatus,
}

impl Default for PlanRecord {
    fn default() -> Self {
        Self {
            last_trajectory: DMatrix::zeros(0, StateDefinition::STATE_DIM),
            last_action: Action::default(),
            status: BehaviorStatus::NotValid,
        }
    }
}

impl PlanRecord {
    pub fn store(&mut self, trajectory: Trajectory, action: Action) -> Trajectory {
        self.last_trajectory = trajectory.clone();
        self.last_action = action;
        self.status = BehaviorStatus::Valid;
        trajectory
    }
}

/// Builds a behavior model by type name.
pub fn behavior_from_name(
    name: &str,
    params: &ParameterServer,
) -> Result<Box<dyn BehaviorModel>, BehaviorError> {
    let model: Box<dyn BehaviorModel> = match name {
        "BehaviorConstantVelocity" => Box::new(BehaviorConstantVelocity::new(params)),
        "BehaviorIDMClassic" => Box::new(BehaviorIDMClassic::new(params)),
        "BehaviorIDMLaneTracking" => Box::new(BehaviorIDMLaneTracking::new(params)),
        "BehaviorSimpleRuleBased" => Box::new(BehaviorSimpleRuleBased::new(params)),
        "BehaviorIntersectionRuleBased" => Box::new(BehaviorIntersectionRuleBased::new(params)),
        other => return Err(BehaviorError::UnknownModel(other.to_string())),
    };
    Ok(model)
}

/// Samples a constant-acceleration motion along `line`.
///
/// Row 0 is `start` unchanged; the remaining `num_points - 1` rows lie on
/// the line, evenly spaced in time over `delta_time`. Speed stops at zero
/// rather than reversing.
pub(crate) fn follow_center_line(
    start: &State,
    line: &Line,
    acceleration: f64,
    delta_time: f64,
    num_points: usize,
) -> Trajectory {
    let num_points = num_points.max(2);
    let t0 = start[StateDefinition::TIME_POSITION];
    let v0 = start[StateDefinition::VEL_POSITION];
    let position = crate::geometry::point(
        start[StateDefinition::X_POSITION],
        start[StateDefinition::Y_POSITION],
    );
    let (_, s0) = line.nearest_point_and_s(position);
    let dt = delta_time / (num_points - 1) as f64;

    let mut states = Vec::with_capacity(num_points);
    states.push(*start);
    for i in 1..num_points {
        let t = i as f64 * dt;
        // stop time when decelerating
        let t_move = if acceleration < 0.0 { t.min(v0 / -acceleration) } else { t };
        let s = s0 + v0 * t_move + 0.5 * acceleration * t_move * t_move;
        let vel = (v0 + acceleration * t).max(0.0);
        let p = line.point_at_s(s);
        states.push(make_state(t0 + t, p.x, p.y, line.angle_at_s(s), vel));
    }

    crate::dynamic::trajectory_from_states(&states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point;
    use approx::assert_relative_eq;

    #[test]
    fn test_behavior_from_name() {
        let params = ParameterServer::new();
        for name in [
            "BehaviorConstantVelocity",
            "BehaviorIDMClassic",
            "BehaviorIDMLaneTracking",
            "BehaviorSimpleRuleBased",
            "BehaviorIntersectionRuleBased",
        ] {
            let model = behavior_from_name(name, &params).unwrap();
            assert_eq!(model.name(), name);
            assert_eq!(model.status(), BehaviorStatus::NotValid);
            assert_eq!(model.last_trajectory().nrows(), 0);
        }

        assert!(matches!(
            behavior_from_name("BehaviorMobil", &params),
            Err(BehaviorError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_follow_center_line_stops() {
        let line = Line::new(vec![point(0.0, 0.0), point(100.0, 0.0)]);
        let start = make_state(0.0, 0.0, 0.5, 0.0, 2.0);

        let trajectory = follow_center_line(&start, &line, -1.0, 4.0, 5);

        assert_eq!(trajectory.nrows(), 5);
        // Row 0 keeps the off-center start
        assert_relative_eq!(trajectory[(0, StateDefinition::Y_POSITION)], 0.5);
        // Stops after 2 s having covered v^2 / 2a = 2 m
        assert_relative_eq!(trajectory[(4, StateDefinition::X_POSITION)], 2.0, epsilon = 1e-9);
        assert_relative_eq!(trajectory[(4, StateDefinition::VEL_POSITION)], 0.0);
        assert_relative_eq!(trajectory[(4, StateDefinition::TIME_POSITION)], 4.0);
    }
}
