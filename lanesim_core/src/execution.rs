//! Execution models: turn a planned trajectory into the next agent state.

use crate::dynamic::{make_state, state_at_row, State, StateDefinition, Trajectory};
use crate::geometry::{normalize_angle, signed_angle_diff};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Cannot execute an empty trajectory")]
    EmptyTrajectory,

    #[error("Invalid type of execution model: {0}")]
    InvalidType(String),
}

/// Known execution model types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionModelKind {
    ExecutionModelInterpolate,
}

impl ExecutionModelKind {
    pub fn build(self) -> Box<dyn ExecutionModel> {
        match self {
            ExecutionModelKind::ExecutionModelInterpolate => Box::new(ExecutionModelInterpolate::new()),
        }
    }
}

impl fmt::Display for ExecutionModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionModelKind::ExecutionModelInterpolate => write!(f, "ExecutionModelInterpolate"),
        }
    }
}

impl FromStr for ExecutionModelKind {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ExecutionModelInterpolate" => Ok(ExecutionModelKind::ExecutionModelInterpolate),
            other => Err(ExecutionError::InvalidType(other.to_string())),
        }
    }
}

/// Samples a trajectory at a given world time.
pub trait ExecutionModel: Send {
    fn execute(&mut self, new_time: f64, trajectory: &Trajectory) -> Result<State, ExecutionError>;

    /// The trajectory handed to the last successful `execute`.
    fn last_trajectory(&self) -> Option<&Trajectory>;

    fn kind(&self) -> ExecutionModelKind;

    fn clone_box(&self) -> Box<dyn ExecutionModel>;
}

impl Clone for Box<dyn ExecutionModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn ExecutionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Linear interpolation between the two trajectory rows bracketing
/// `new_time`. Headings interpolate along the shorter arc.
///
/// Times before the first row or after the last clamp to that row, with the
/// time column set to `new_time`.
#[derive(Debug, Clone, Default)]
pub struct ExecutionModelInterpolate {
    last_trajectory: Option<Trajectory>,
}

impl ExecutionModelInterpolate {
    pub fn new() -> Self {
        Self::default()
    }

    fn interpolate(trajectory: &Trajectory, new_time: f64) -> State {
        let rows = trajectory.nrows();
        let time = |row: usize| trajectory[(row, StateDefinition::TIME_POSITION)];

        let clamped = |row: usize| {
            let mut state = state_at_row(trajectory, row);
            state[StateDefinition::TIME_POSITION] = new_time;
            state
        };
        if new_time <= time(0) {
            return clamped(0);
        }
        if new_time >= time(rows - 1) {
            return clamped(rows - 1);
        }

        let upper = (1..rows).find(|&row| time(row) >= new_time).unwrap_or(rows - 1);
        let a = state_at_row(trajectory, upper - 1);
        let b = state_at_row(trajectory, upper);
        let span = time(upper) - time(upper - 1);
        let alpha = if span > 0.0 { (new_time - time(upper - 1)) / span } else { 1.0 };
        let lerp = |i: usize| a[i] + alpha * (b[i] - a[i]);

        let theta_a = a[StateDefinition::THETA_POSITION];
        let theta = theta_a + alpha * signed_angle_diff(b[StateDefinition::THETA_POSITION], theta_a);

        make_state(
            new_time,
            lerp(StateDefinition::X_POSITION),
            lerp(StateDefinition::Y_POSITION),
            normalize_angle(theta),
            lerp(StateDefinition::VEL_POSITION),
        )
    }
}

impl ExecutionModel for ExecutionModelInterpolate {
    fn execute(&mut self, new_time: f64, trajectory: &Trajectory) -> Result<State, ExecutionError> {
        if trajectory.nrows() == 0 {
            return Err(ExecutionError::EmptyTrajectory);
        }
        let state = Self::interpolate(trajectory, new_time);
        self.last_trajectory = Some(trajectory.clone());
        Ok(state)
    }

    fn last_trajectory(&self) -> Option<&Trajectory> {
        self.last_trajectory.as_ref()
    }

    fn kind(&self) -> ExecutionModelKind {
        ExecutionModelKind::ExecutionModelInterpolate
    }

    fn clone_box(&self) -> Box<dyn ExecutionModel> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::trajectory_from_states;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn two_point_trajectory() -> Trajectory {
        trajectory_from_states(&[
            make_state(0.0, 0.0, 0.0, 0.0, 10.0),
            make_state(1.0, 10.0, 2.0, 0.2, 12.0),
        ])
    }

    #[test]
    fn test_interpolate_midpoint() {
        let mut model = ExecutionModelInterpolate::new();
        let state = model.execute(0.25, &two_point_trajectory()).unwrap();

        assert_relative_eq!(state[StateDefinition::TIME_POSITION], 0.25);
        assert_relative_eq!(state[StateDefinition::X_POSITION], 2.5);
        assert_relative_eq!(state[StateDefinition::Y_POSITION], 0.5);
        assert_relative_eq!(state[StateDefinition::THETA_POSITION], 0.05, epsilon = 1e-12);
        assert_relative_eq!(state[StateDefinition::VEL_POSITION], 10.5);
        assert!(model.last_trajectory().is_some());
    }

    #[test]
    fn test_interpolate_clamps_outside_range() {
        let mut model = ExecutionModelInterpolate::new();
        let trajectory = two_point_trajectory();

        let after = model.execute(3.0, &trajectory).unwrap();
        assert_relative_eq!(after[StateDefinition::TIME_POSITION], 3.0);
        assert_relative_eq!(after[StateDefinition::X_POSITION], 10.0);

        let before = model.execute(-1.0, &trajectory).unwrap();
        assert_relative_eq!(before[StateDefinition::TIME_POSITION], -1.0);
        assert_relative_eq!(before[StateDefinition::X_POSITION], 0.0);
    }

    #[test]
    fn test_interpolate_heading_across_pi() {
        let trajectory = trajectory_from_states(&[
            make_state(0.0, 0.0, 0.0, PI - 0.1, 1.0),
            make_state(1.0, 0.0, 0.0, -PI + 0.1, 1.0),
        ]);
        let mut model = ExecutionModelInterpolate::new();
        let state = model.execute(0.5, &trajectory).unwrap();

        assert_relative_eq!(state[StateDefinition::THETA_POSITION].abs(), PI, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_trajectory_rejected() {
        let mut model = ExecutionModelInterpolate::new();
        let empty = Trajectory::zeros(0, StateDefinition::STATE_DIM);
        assert_eq!(model.execute(1.0, &empty), Err(ExecutionError::EmptyTrajectory));
        assert!(model.last_trajectory().is_none());
    }

    #[test]
    fn test_execution_kind_from_str() {
        let kind: ExecutionModelKind = "ExecutionModelInterpolate".parse().unwrap();
        assert_eq!(kind, ExecutionModelKind::ExecutionModelInterpolate);
        assert_eq!(kind.build().kind(), kind);

        let err = "ExecutionModelMpc".parse::<ExecutionModelKind>().unwrap_err();
        assert!(err.to_string().starts_with("Invalid type of execution model"));
    }
}
