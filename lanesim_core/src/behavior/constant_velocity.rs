//! Constant-velocity lane following.

use super::{follow_center_line, Action, BehaviorModel, BehaviorStatus, PlanRecord};
use crate::dynamic::Trajectory;
use crate::params::ParameterServer;
use crate::world::ObservedWorld;

/// Keeps the current speed and follows the corridor center line.
///
/// Also the model used to predict other agents (see [`ObservedWorld::predict`]).
#[derive(Debug, Clone)]
pub struct BehaviorConstantVelocity {
    num_points: usize,
    record: PlanRecord,
}

impl BehaviorConstantVelocity {
    pub fn new(params: &ParameterServer) -> Self {
        let num_points = params
            .get_int(
                "BehaviorConstantVelocity::NumTrajectoryTimePoints",
                "Rows per planned trajectory",
                11,
            )
            .max(2) as usize;
        Self {
            num_points,
            record: PlanRecord::default(),
        }
    }
}

impl BehaviorModel for BehaviorConstantVelocity {
    fn plan(&mut self, delta_time: f64, observed_world: &ObservedWorld) -> Trajectory {
        let trajectory = follow_center_line(
            &observed_world.ego().state,
            observed_world.lane_corridor().center_line(),
            0.0,
            delta_time,
            self.num_points,
        );
        self.record.store(trajectory, Action::default())
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
        "BehaviorConstantVelocity"
    }

    fn clone_box(&self) -> Box<dyn BehaviorModel> {
        Box::new(self.clone())
    }
}
