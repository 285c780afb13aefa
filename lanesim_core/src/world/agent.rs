use super::goal::GoalDefinitionPolygon;
use super::observed::AgentSnapshot;
use crate::behavior::BehaviorModel;
use crate::dynamic::{State, StateDefinition};
use crate::execution::ExecutionModel;
use crate::geometry::{point, standard_shapes, Point2d, Polygon2d};
use crate::map::LaneCorridor;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

pub type AgentId = u32;

/// States kept in an agent's history.
pub const MAX_HISTORY_LENGTH: usize = 100;

/// A simulated traffic participant.
#[derive(Clone)]
pub struct Agent {
    pub id: AgentId,
    /// Current state `[time, x, y, theta, vel]`
    pub state: State,
    /// Footprint in the body frame
    pub shape: Polygon2d,
    pub behavior: Box<dyn BehaviorModel>,
    pub execution: Box<dyn ExecutionModel>,
    /// Corridor the agent drives along
    pub corridor: Arc<LaneCorridor>,
    pub goal: Option<GoalDefinitionPolygon>,
    history: VecDeque<State>,
}

impl Agent {
    /// Creates an agent with a passenger-car footprint and no goal.
    pub fn new(
        id: AgentId,
        state: State,
        behavior: Box<dyn BehaviorModel>,
        execution: Box<dyn ExecutionModel>,
        corridor: Arc<LaneCorridor>,
    ) -> Self {
        Self {
            id,
            state,
            shape: standard_shapes::car_limousine(),
            behavior,
            execution,
            corridor,
            goal: None,
            history: VecDeque::new(),
        }
    }

    pub fn with_goal(mut self, goal: GoalDefinitionPolygon) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn position(&self) -> Point2d {
        point(self.state[StateDefinition::X_POSITION], self.state[StateDefinition::Y_POSITION])
    }

    /// Footprint in the map frame.
    pub fn polygon(&self) -> Polygon2d {
        self.shape.transform(
            self.state[StateDefinition::X_POSITION],
            self.state[StateDefinition::Y_POSITION],
            self.state[StateDefinition::THETA_POSITION],
        )
    }

    /// Previous states, oldest first.
    pub fn history(&self) -> &VecDeque<State> {
        &self.history
    }

    /// Arc length of the agent along its corridor.
    pub fn corridor_s(&self) -> f64 {
        self.corridor.center_line().nearest_point_and_s(self.position()).1
    }

    pub fn at_goal(&self) -> bool {
        self.goal
            .as_ref()
            .is_some_and(|goal| goal.at_goal(self.position()))
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            state: self.state,
            shape: self.shape.clone(),
            corridor: Arc::clone(&self.corridor),
        }
    }

    pub(crate) fn commit(&mut self, state: State) {
        if self.history.len() == MAX_HISTORY_LENGTH {
            self.history.pop_front();
        }
        self.history.push_back(self.state);
        self.state = state;
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("state", &self.state.as_slice())
            .field("behavior", &self.behavior.name())
            .field("execution", &self.execution.kind())
            .field("corridor", &self.corridor.to_string())
            .field("goal", &self.goal.is_some())
            .finish()
    }
}
