//! Vehicle state, trajectories and the single-track (bicycle) model.

use crate::params::ParameterServer;
use nalgebra::{DMatrix, SVector, Vector4};

/// `[time, x, y, theta, vel]`
pub type State = SVector<f64, 5>;

/// One [`State`] per row, ordered by time.
pub type Trajectory = DMatrix<f64>;

/// Column indices into [`State`] and [`Trajectory`].
pub struct StateDefinition;

impl StateDefinition {
    pub const TIME_POSITION: usize = 0;
    pub const X_POSITION: usize = 1;
    pub const Y_POSITION: usize = 2;
    pub const THETA_POSITION: usize = 3;
    pub const VEL_POSITION: usize = 4;
    pub const STATE_DIM: usize = 5;
}

/// Builds a state vector.
pub fn make_state(time: f64, x: f64, y: f64, theta: f64, vel: f64) -> State {
    State::new(time, x, y, theta, vel)
}

/// Stacks states into a trajectory.
pub fn trajectory_from_states(states: &[State]) -> Trajectory {
    DMatrix::from_fn(states.len(), StateDefinition::STATE_DIM, |r, c| states[r][c])
}

/// Extracts row `row` of a trajectory.
pub fn state_at_row(trajectory: &Trajectory, row: usize) -> State {
    State::from_iterator(trajectory.row(row).iter().copied())
}

/// Control input for the single-track model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Input {
    /// Longitudinal acceleration (m/s^2)
    pub acceleration: f64,
    /// Front wheel steering angle (rad)
    pub steering: f64,
}

/// Kinematic single-track model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleTrackModel {
    /// Distance between the axles (m)
    pub wheel_base: f64,
    /// Steering magnitude limit (rad)
    pub delta_max: f64,
}

impl Default for SingleTrackModel {
    fn default() -> Self {
        Self {
            wheel_base: 2.7,
            delta_max: 0.5,
        }
    }
}

impl SingleTrackModel {
    pub fn from_params(params: &ParameterServer) -> Self {
        let defaults = Self::default();
        Self {
            wheel_base: params.get_real("DynamicModel::wheel_base", "Wheel base of the vehicle", defaults.wheel_base),
            delta_max: params.get_real("DynamicModel::delta_max", "Maximum steering angle", defaults.delta_max),
        }
    }

    /// Time derivative of `[x, y, theta, vel]`.
    fn derivative(&self, q: &Vector4<f64>, input: Input) -> Vector4<f64> {
        let (theta, vel) = (q[2], q[3]);
        Vector4::new(
            vel * theta.cos(),
            vel * theta.sin(),
            vel * input.steering.tan() / self.wheel_base,
            input.acceleration,
        )
    }

    /// Integrates one step with RK4. Speed never goes negative.
    pub fn integrate(&self, state: &State, input: Input, dt: f64) -> State {
        let input = Input {
            steering: input.steering.clamp(-self.delta_max, self.delta_max),
            ..input
        };
        let q = Vector4::new(
            state[StateDefinition::X_POSITION],
            state[StateDefinition::Y_POSITION],
            state[StateDefinition::THETA_POSITION],
            state[StateDefinition::VEL_POSITION],
        );

        let k1 = self.derivative(&q, input);
        let k2 = self.derivative(&(q + k1 * (dt / 2.0)), input);
        let k3 = self.derivative(&(q + k2 * (dt / 2.0)), input);
        let k4 = self.derivative(&(q + k3 * dt), input);
        let next = q + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0);

        make_state(
            state[StateDefinition::TIME_POSITION] + dt,
            next[0],
            next[1],
            next[2],
            next[3].max(0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_acceleration() {
        let model = SingleTrackModel::default();
        let state = make_state(0.0, 0.0, 0.0, 0.0, 10.0);

        let next = model.integrate(&state, Input { acceleration: 2.0, steering: 0.0 }, 1.0);

        assert_relative_eq!(next[StateDefinition::TIME_POSITION], 1.0);
        assert_relative_eq!(next[StateDefinition::X_POSITION], 11.0, epsilon = 1e-9);
        assert_relative_eq!(next[StateDefinition::Y_POSITION], 0.0);
        assert_relative_eq!(next[StateDefinition::VEL_POSITION], 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_steering_turns_left() {
        let model = SingleTrackModel::default();
        let state = make_state(0.0, 0.0, 0.0, 0.0, 5.0);

        let next = model.integrate(&state, Input { acceleration: 0.0, steering: 0.2 }, 0.5);

        assert!(next[StateDefinition::THETA_POSITION] > 0.0);
        assert!(next[StateDefinition::Y_POSITION] > 0.0);
    }

    #[test]
    fn test_velocity_floor_and_steering_clamp() {
        let model = SingleTrackModel::default();
        let state = make_state(0.0, 0.0, 0.0, 0.0, 1.0);

        let stopped = model.integrate(&state, Input { acceleration: -5.0, steering: 0.0 }, 1.0);
        assert_eq!(stopped[StateDefinition::VEL_POSITION], 0.0);

        let wild = model.integrate(&state, Input { acceleration: 0.0, steering: 3.0 }, 0.1);
        let clamped = model.integrate(&state, Input { acceleration: 0.0, steering: model.delta_max }, 0.1);
        assert_relative_eq!(wild[StateDefinition::THETA_POSITION], clamped[StateDefinition::THETA_POSITION]);
    }

    #[test]
    fn test_trajectory_rows() {
        let states = [make_state(0.0, 1.0, 2.0, 0.0, 3.0), make_state(0.1, 1.3, 2.0, 0.0, 3.0)];
        let trajectory = trajectory_from_states(&states);

        assert_eq!(trajectory.nrows(), 2);
        assert_eq!(state_at_row(&trajectory, 1), states[1]);
    }
}
