//! Intelligent Driver Model planners.

use super::{follow_center_line, Action, BehaviorModel, BehaviorStatus, PlanRecord};
use crate::dynamic::{trajectory_from_states, Input, SingleTrackModel, StateDefinition, Trajectory};
use crate::geometry::{normalize_angle, point, Point2d};
use crate::map::LaneCorridor;
use crate::params::ParameterServer;
use crate::world::ObservedWorld;

/// Floor applied to `DesiredVelocity`; the free-road term divides by it.
const MIN_DESIRED_VELOCITY: f64 = 0.1;

/// IDM tuning, read from the `BehaviorIDMClassic` parameter subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct IdmParameters {
    /// v0 (m/s)
    pub desired_velocity: f64,
    /// s0 (m)
    pub minimum_spacing: f64,
    /// T (s)
    pub desired_time_headway: f64,
    /// a (m/s^2)
    pub max_acceleration: f64,
    pub acceleration_lower_bound: f64,
    pub acceleration_upper_bound: f64,
    /// b (m/s^2)
    pub comfortable_braking: f64,
    /// delta
    pub exponent: f64,
    pub num_trajectory_time_points: usize,
    /// Treat the corridor end as a standing obstacle
    pub brake_for_lane_end: bool,
}

impl Default for IdmParameters {
    fn default() -> Self {
        Self {
            desired_velocity: 15.0,
            minimum_spacing: 2.0,
            desired_time_headway: 1.5,
            max_acceleration: 1.7,
            acceleration_lower_bound: -5.0,
            acceleration_upper_bound: 8.0,
            comfortable_braking: 1.67,
            exponent: 4.0,
            num_trajectory_time_points: 11,
            brake_for_lane_end: false,
        }
    }
}

impl IdmParameters {
    pub fn from_params(params: &ParameterServer) -> Self {
        let p = params.child("BehaviorIDMClassic");
        let d = Self::default();
        Self {
            desired_velocity: p
                .get_real("DesiredVelocity", "Desired velocity of the vehicle (m/s)", d.desired_velocity)
                .max(MIN_DESIRED_VELOCITY),
            minimum_spacing: p.get_real("MinimumSpacing", "Minimum gap to the leader (m)", d.minimum_spacing),
            desired_time_headway: p.get_real("DesiredTimeHeadway", "Desired time headway (s)", d.desired_time_headway),
            max_acceleration: p.get_real("MaxAcceleration", "Maximum acceleration (m/s^2)", d.max_acceleration),
            acceleration_lower_bound: p.get_real("AccelerationLowerBound", "Lower clamp on acceleration", d.acceleration_lower_bound),
            acceleration_upper_bound: p.get_real("AccelerationUpperBound", "Upper clamp on acceleration", d.acceleration_upper_bound),
            comfortable_braking: p.get_real("ComfortableBrakingAcceleration", "Comfortable deceleration (m/s^2)", d.comfortable_braking),
            exponent: p.get_real("Exponent", "Free-road acceleration exponent", d.exponent),
            num_trajectory_time_points: p
                .get_int("NumTrajectoryTimePoints", "Rows per planned trajectory", d.num_trajectory_time_points as i64)
                .max(2) as usize,
            brake_for_lane_end: p.get_bool("BrakeForLaneEnd", "Stop at the end of the corridor", d.brake_for_lane_end),
        }
    }
}

/// Gap and speed of whatever the ego has to follow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeValues {
    /// Bumper-to-bumper distance (m)
    pub net_distance: f64,
    /// Leader speed (m/s)
    pub other_velocity: f64,
    /// False when the road ahead is free
    pub interaction_considered: bool,
}

impl RelativeValues {
    pub fn free_road() -> Self {
        Self {
            net_distance: f64::INFINITY,
            other_velocity: 0.0,
            interaction_considered: false,
        }
    }
}

/// Shared IDM machinery.
#[derive(Debug, Clone)]
pub struct IdmCore {
    pub params: IdmParameters,
}

impl IdmCore {
    pub fn new(params: &ParameterServer) -> Self {
        Self {
            params: IdmParameters::from_params(params),
        }
    }

    fn free_road_term(&self, vel: f64) -> f64 {
        let p = &self.params;
        p.max_acceleration * (1.0 - (vel / p.desired_velocity).powf(p.exponent))
    }

    fn interaction_term(&self, net_distance: f64, vel: f64, other_velocity: f64) -> f64 {
        let p = &self.params;
        let braking = 2.0 * (p.max_acceleration * p.comfortable_braking).sqrt();
        let desired_gap = p.minimum_spacing
            + (vel * p.desired_time_headway + vel * (vel - other_velocity) / braking).max(0.0);
        -p.max_acceleration * (desired_gap / net_distance.max(1e-3)).powi(2)
    }

    /// IDM acceleration, clamped to the configured bounds.
    pub fn idm_acceleration(&self, vel: f64, relative: &RelativeValues) -> f64 {
        let mut acc = self.free_road_term(vel);
        if relative.interaction_considered {
            acc += self.interaction_term(relative.net_distance, vel, relative.other_velocity);
        }
        acc.clamp(
            self.params.acceleration_lower_bound,
            self.params.acceleration_upper_bound,
        )
    }

    /// Finds the nearest agent ahead of the ego inside `corridor`.
    pub fn calc_relative_values(
        &self,
        observed_world: &ObservedWorld,
        corridor: &LaneCorridor,
    ) -> RelativeValues {
        let ego = observed_world.ego();
        let line = corridor.center_line();
        let (_, s_ego) = line.nearest_point_and_s(ego.position());
        let polygon = corridor.merged_polygon();

        let mut relative = RelativeValues::free_road();
        let mut nearest_s = f64::INFINITY;

        for other in observed_world.others() {
            if !polygon.contains_point(other.position()) {
                continue;
            }
            let (_, s_other) = line.nearest_point_and_s(other.position());
            if s_other > s_ego && s_other < nearest_s {
                nearest_s = s_other;
                relative = RelativeValues {
                    net_distance: s_other - s_ego - ego.front_length() - other.rear_length(),
                    other_velocity: other.velocity(),
                    interaction_considered: true,
                };
            }
        }

        if self.params.brake_for_lane_end {
            let to_end = corridor.length() - s_ego - ego.front_length();
            if to_end < relative.net_distance {
                relative = RelativeValues {
                    net_distance: to_end,
                    other_velocity: 0.0,
                    interaction_considered: true,
                };
            }
        }

        relative
    }

    /// Plans along the corridor center line with the IDM acceleration.
    pub fn generate_trajectory(
        &self,
        observed_world: &ObservedWorld,
        corridor: &LaneCorridor,
        relative: &RelativeValues,
        delta_time: f64,
    ) -> (Trajectory, Action) {
        let ego_state = observed_world.ego().state;
        let acc = self.idm_acceleration(ego_state[StateDefinition::VEL_POSITION], relative);
        let trajectory = follow_center_line(
            &ego_state,
            corridor.center_line(),
            acc,
            delta_time,
            self.params.num_trajectory_time_points,
        );
        (trajectory, Input { acceleration: acc, steering: 0.0 })
    }
}

/// IDM longitudinal control, placed exactly on the corridor center line.
#[derive(Debug, Clone)]
pub struct BehaviorIDMClassic {
    core: IdmCore,
    record: PlanRecord,
}

impl BehaviorIDMClassic {
    pub fn new(params: &ParameterServer) -> Self {
        Self {
            core: IdmCore::new(params),
            record: PlanRecord::default(),
        }
    }

    pub fn core(&self) -> &IdmCore {
        &self.core
    }
}

impl BehaviorModel for BehaviorIDMClassic {
    fn plan(&mut self, delta_time: f64, observed_world: &ObservedWorld) -> Trajectory {
        let corridor = observed_world.lane_corridor();
        let relative = self.core.calc_relative_values(observed_world, corridor);
        let (trajectory, action) =
            self.core
                .generate_trajectory(observed_world, corridor, &relative, delta_time);
        self.record.store(trajectory, action)
    }

    fn last_trajectory(&self) -> &Trajectory {
        &self.record.last_trajectory
    }

    fn last_action(&self) -> Action {
        self.record.last_action
    }

    fn status(&self) -> BehaviorStatus {
        self.record.status
    }

    fn name(&self) -> &'static str {
        "BehaviorIDMClassic"
    }

    fn clone_box(&self) -> Box<dyn BehaviorModel> {
        Box::new(self.clone())
    }
}

/// IDM longitudinal control plus Stanley lateral control, integrated
/// through the single-track model.
#[derive(Debug, Clone)]
pub struct BehaviorIDMLaneTracking {
    core: IdmCore,
    dynamic: SingleTrackModel,
    crosstrack_error_gain: f64,
    record: PlanRecord,
}

impl BehaviorIDMLaneTracking {
    pub fn new(params: &ParameterServer) -> Self {
        Self {
            core: IdmCore::new(params),
            dynamic: SingleTrackModel::from_params(params),
            crosstrack_error_gain: params.get_real(
                "BehaviorIDMLaneTracking::CrosstrackErrorGain",
                "Gain of the Stanley cross-track term",
                1.0,
            ),
            record: PlanRecord::default(),
        }
    }

    pub fn core(&self) -> &IdmCore {
        &self.core
    }

    pub fn crosstrack_error_gain(&self) -> f64 {
        self.crosstrack_error_gain
    }

    /// Stanley steering towards `corridor`'s center line.
    fn steering(&self, corridor: &LaneCorridor, position: Point2d, theta: f64, vel: f64) -> f64 {
        let line = corridor.center_line();
        let (nearest, s) = line.nearest_point_and_s(position);
        let path_theta = line.angle_at_s(s);
        // positive when the vehicle is left of the line
        let crosstrack = path_theta.cos() * (position.y - nearest.y)
            - path_theta.sin() * (position.x - nearest.x);
        let heading_error = normalize_angle(path_theta - theta);
        heading_error + (-self.crosstrack_error_gain * crosstrack).atan2(vel.max(1.0))
    }

    /// Plans with a precomputed relative situation against `corridor`.
    pub(crate) fn generate_trajectory(
        &self,
        observed_world: &ObservedWorld,
        corridor: &LaneCorridor,
        relative: &RelativeValues,
        delta_time: f64,
    ) -> (Trajectory, Action) {
        let start = observed_world.ego().state;
        let acc = self
            .core
            .idm_acceleration(start[StateDefinition::VEL_POSITION], relative);
        let num_points = self.core.params.num_trajectory_time_points;
        let dt = delta_time / (num_points - 1) as f64;

        let mut states = Vec::with_capacity(num_points);
        let mut first_input = None;
        let mut state = start;
        states.push(state);
        for _ in 1..num_points {
            let position = point(state[StateDefinition::X_POSITION], state[StateDefinition::Y_POSITION]);
            let steering = self.steering(
                corridor,
                position,
                state[StateDefinition::THETA_POSITION],
                state[StateDefinition::VEL_POSITION],
            );
            let input = Input { acceleration: acc, steering };
            first_input.get_or_insert(input);
            state = self.dynamic.integrate(&state, input, dt);
            state[StateDefinition::THETA_POSITION] = normalize_angle(state[StateDefinition::THETA_POSITION]);
            states.push(state);
        }

        (trajectory_from_states(&states), first_input.unwrap_or_default())
    }

    pub(crate) fn record_mut(&mut self) -> &mut PlanRecord {
        &mut self.record
    }
}

impl BehaviorModel for BehaviorIDMLaneTracking {
    fn plan(&mut self, delta_time: f64, observed_world: &ObservedWorld) -> Trajectory {
        let corridor = observed_world.lane_corridor();
        let relative = self.core.calc_relative_values(observed_world, corridor);
        let (trajectory, action) =
            self.generate_trajectory(observed_world, corridor, &relative, delta_time);
        self.record.store(trajectory, action)
    }

    fn last_trajectory(&self) -> &Trajectory {
        &self.record.last_trajectory
    }

    fn last_action(&self) -> Action {
        self.record.last_action
    }

    fn status(&self) -> BehaviorStatus {
        self.record.status
    }

    fn name(&self) -> &'static str {
        "BehaviorIDMLaneTracking"
    }

    fn clone_box(&self) -> Box<dyn BehaviorModel> {
        Box::new(self.clone())
    }
}
