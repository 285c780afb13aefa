//! Rule-based planners built on lane-tracking IDM.

use super::{Action, BehaviorIDMLaneTracking, BehaviorModel, BehaviorStatus};
use crate::dynamic::{StateDefinition, Trajectory};
use crate::geometry::signed_angle_diff;
use crate::map::LaneCorridor;
use crate::params::ParameterServer;
use crate::world::{AgentId, AgentSnapshot, ObservedWorld};
use std::sync::Arc;
use tracing::debug;

/// Outcome of the lane-change check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneChangeDecision {
    KeepLane,
    ChangeLeft,
    ChangeRight,
}

/// Lane-tracking IDM with a lane-change decision step.
///
/// Corridors here span a single lane, so the decision always keeps the
/// current corridor; the hook is where a multi-lane road would compare
/// free space on neighbouring corridors.
#[derive(Debug, Clone)]
pub struct BehaviorSimpleRuleBased {
    lane_tracking: BehaviorIDMLaneTracking,
}

impl BehaviorSimpleRuleBased {
    pub fn new(params: &ParameterServer) -> Self {
        Self {
            lane_tracking: BehaviorIDMLaneTracking::new(params),
        }
    }

    pub fn check_if_lane_change_beneficial(
        &self,
        observed_world: &ObservedWorld,
    ) -> (LaneChangeDecision, Arc<LaneCorridor>) {
        (LaneChangeDecision::KeepLane, Arc::clone(observed_world.lane_corridor()))
    }

    pub fn lane_tracking(&self) -> &BehaviorIDMLaneTracking {
        &self.lane_tracking
    }
}

impl BehaviorModel for BehaviorSimpleRuleBased {
    fn plan(&mut self, delta_time: f64, observed_world: &ObservedWorld) -> Trajectory {
        let (_, corridor) = self.check_if_lane_change_beneficial(observed_world);
        let relative = self
            .lane_tracking
            .core()
            .calc_relative_values(observed_world, &corridor);
        let (trajectory, action) =
            self.lane_tracking
                .generate_trajectory(observed_world, &corridor, &relative, delta_time);
        self.lane_tracking.record_mut().store(trajectory, action)
    }

    fn last_trajectory(&self) -> &Trajectory {
        self.lane_tracking.last_trajectory()
    }

    fn last_action(&self) -> Action {
        self.lane_tracking.last_action()
    }

    fn status(&self) -> BehaviorStatus {
        self.lane_tracking.status()
    }

    fn name(&self) -> &'static str {
        "BehaviorSimpleRuleBased"
    }

    fn clone_box(&self) -> Box<dyn BehaviorModel> {
        Box::new(self.clone())
    }
}

/// Tuning for crossing-traffic checks, read from the
/// `BehaviorIntersectionRuleBased` parameter subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionParameters {
    /// Crossing agents further ahead than this (m) are ignored
    pub braking_distance: f64,
    /// How far ahead other agents are predicted (s)
    pub prediction_time_horizon: f64,
    /// Prediction sampling step (s)
    pub prediction_time_increment: f64,
    /// Minimum heading difference (rad) for an agent to count as crossing
    pub angle_diff_for_intersection: f64,
}

impl Default for IntersectionParameters {
    fn default() -> Self {
        Self {
            braking_distance: 10.0,
            prediction_time_horizon: 3.0,
            prediction_time_increment: 0.5,
            angle_diff_for_intersection: 1.4,
        }
    }
}

impl IntersectionParameters {
    pub fn from_params(params: &ParameterServer) -> Self {
        let p = params.child("BehaviorIntersectionRuleBased");
        let d = Self::default();
        Self {
            braking_distance: p.get_real("BrakingDistance", "Distance ahead in which crossing agents matter (m)", d.braking_distance),
            prediction_time_horizon: p.get_real("PredictionTimeHorizon", "Prediction horizon for other agents (s)", d.prediction_time_horizon),
            prediction_time_increment: p
                .get_real("PredictionTimeIncrement", "Prediction sampling step (s)", d.prediction_time_increment)
                .max(1e-3),
            angle_diff_for_intersection: p.get_real("AngleDiffForIntersection", "Heading difference marking a crossing agent (rad)", d.angle_diff_for_intersection),
        }
    }
}

/// Rule-based planner that yields to agents predicted to cross its corridor.
#[derive(Debug, Clone)]
pub struct BehaviorIntersectionRuleBased {
    simple: BehaviorSimpleRuleBased,
    params: IntersectionParameters,
}

impl BehaviorIntersectionRuleBased {
    pub fn new(params: &ParameterServer) -> Self {
        Self {
            simple: BehaviorSimpleRuleBased::new(params),
            params: IntersectionParameters::from_params(params),
        }
    }

    pub fn params(&self) -> &IntersectionParameters {
        &self.params
    }

    /// Picks the first candidate that crosses the ego corridor ahead of the ego.
    pub fn filter_lane_corridor_intersecting_agents<'a>(
        &self,
        candidates: &[&'a AgentSnapshot],
        observed_world: &ObservedWorld,
    ) -> Option<&'a AgentSnapshot> {
        let ego = observed_world.ego();
        let ego_corridor = observed_world.lane_corridor();
        let line = ego_corridor.center_line();
        let (_, s_ego) = line.nearest_point_and_s(ego.position());

        candidates.iter().copied().find(|agent| {
            if agent.id == ego.id || *agent.corridor == **ego_corridor {
                return false;
            }
            let heading_diff = signed_angle_diff(
                ego.state[StateDefinition::THETA_POSITION],
                agent.state[StateDefinition::THETA_POSITION],
            )
            .abs();
            let (_, s_other) = line.nearest_point_and_s(agent.position());
            heading_diff > self.params.angle_diff_for_intersection
                && s_other > s_ego
                && s_other - s_ego < self.params.braking_distance
        })
    }

    /// Predicts other agents at constant velocity and returns the augmented
    /// distance (`v_other * t_intersection`) and id of the first one found
    /// crossing `corridor`.
    pub fn check_intersecting_vehicles(
        &self,
        corridor: &LaneCorridor,
        observed_world: &ObservedWorld,
    ) -> Option<(f64, AgentId)> {
        let mut step = 0;
        loop {
            let t = step as f64 * self.params.prediction_time_increment;
            if t >= self.params.prediction_time_horizon {
                return None;
            }

            let predicted = observed_world.predict(t);
            let candidates = predicted.agents_intersecting_polygon(corridor.merged_polygon());
            if let Some(agent) = self.filter_lane_corridor_intersecting_agents(&candidates, observed_world) {
                return Some((agent.velocity() * t, agent.id));
            }
            step += 1;
        }
    }
}

impl BehaviorModel for BehaviorIntersectionRuleBased {
    fn plan(&mut self, delta_time: f64, observed_world: &ObservedWorld) -> Trajectory {
        let (_, corridor) = self.simple.check_if_lane_change_beneficial(observed_world);
        let lane_tracking = &self.simple.lane_tracking;

        let mut relative = lane_tracking
            .core()
            .calc_relative_values(observed_world, &corridor);

        if let Some((augmented_distance, other)) = self.check_intersecting_vehicles(&corridor, observed_world) {
            relative.net_distance = augmented_distance;
            relative.other_velocity = 0.0;
            relative.interaction_considered = true;
            debug!(
                "Agent {}: Agent {} is intersecting my corridor.",
                observed_world.ego_id(),
                other
            );
        }

        let (trajectory, action) =
            lane_tracking.generate_trajectory(observed_world, &corridor, &relative, delta_time);
        self.simple.lane_tracking.record_mut().store(trajectory, action)
    }

    fn last_trajectory(&self) -> &Trajectory {
        self.simple.last_trajectory()
    }

    fn last_action(&self) -> Action {
        self.simple.last_action()
    }

    fn status(&self) -> BehaviorStatus {
        self.simple.status()
    }

    fn name(&self) -> &'static str {
        "BehaviorIntersectionRuleBased"
    }

    fn clone_box(&self) -> Box<dyn BehaviorModel> {
        Box::new(self.clone())
    }
}
