//! The simulated world: agents on a map, stepped in lock-step.

mod agent;
mod goal;
mod observed;

pub use agent::{Agent, AgentId, MAX_HISTORY_LENGTH};
pub use goal::GoalDefinitionPolygon;
pub use observed::{AgentSnapshot, ObservedWorld};

use crate::error::CoreError;
use crate::geometry::{BoundingBox, Polygon2d};
use crate::map::MapInterface;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Agents closer than this (m) to their corridor end are removed.
pub const END_OF_CORRIDOR_TOLERANCE: f64 = 0.1;

/// Map, agents and world time.
#[derive(Debug, Clone)]
pub struct World {
    map: Arc<MapInterface>,
    agents: BTreeMap<AgentId, Agent>,
    time: f64,
}

impl World {
    pub fn new(map: Arc<MapInterface>) -> Self {
        Self {
            map,
            agents: BTreeMap::new(),
            time: 0.0,
        }
    }

    pub fn map(&self) -> &Arc<MapInterface> {
        &self.map
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn add_agent(&mut self, agent: Agent) -> Result<(), CoreError> {
        if self.agents.contains_key(&agent.id) {
            return Err(CoreError::DuplicateAgent(agent.id));
        }
        self.agents.insert(agent.id, agent);
        Ok(())
    }

    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    pub fn agents(&self) -> &BTreeMap<AgentId, Agent> {
        &self.agents
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn snapshots(&self) -> BTreeMap<AgentId, AgentSnapshot> {
        self.agents
            .iter()
            .map(|(id, agent)| (*id, agent.snapshot()))
            .collect()
    }

    /// The world from the perspective of agent `id`.
    pub fn observe(&self, id: AgentId) -> Option<ObservedWorld> {
        ObservedWorld::new(id, self.time, &self.snapshots())
    }

    /// Advances the world by `delta_time`.
    ///
    /// Every agent plans against the same snapshot of the current world,
    /// then all new states are committed together. Agents that reached the
    /// end of their corridor are removed afterwards.
    pub fn step(&mut self, delta_time: f64) -> Result<(), CoreError> {
        let new_time = self.time + delta_time;
        let snapshots = self.snapshots();

        let mut new_states = Vec::with_capacity(self.agents.len());
        for (id, agent) in self.agents.iter_mut() {
            let observed =
                ObservedWorld::new(*id, self.time, &snapshots).ok_or(CoreError::UnknownAgent(*id))?;
            let trajectory = agent.behavior.plan(delta_time, &observed);
            let state = agent
                .execution
                .execute(new_time, &trajectory)
                .map_err(|error| CoreError::execution(*id, error))?;
            new_states.push((*id, state));
        }

        for (id, state) in new_states {
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.commit(state);
            }
        }
        self.time = new_time;
        trace!("World stepped to t={:.3} with {} agents", self.time, self.agents.len());

        self.agents.retain(|id, agent| {
            let remaining = agent.corridor.length() - agent.corridor_s();
            let keep = remaining >= END_OF_CORRIDOR_TOLERANCE;
            if !keep {
                debug!("Agent {} reached the end of {} and was removed", id, agent.corridor);
            }
            keep
        });
        Ok(())
    }

    /// Ids of agents whose footprint touches `polygon`.
    pub fn agents_intersecting_polygon(&self, polygon: &Polygon2d) -> Vec<AgentId> {
        self.agents
            .values()
            .filter(|agent| agent.polygon().intersects(polygon))
            .map(|agent| agent.id)
            .collect()
    }

    /// Pairs of agents whose footprints overlap, lower id first.
    pub fn collisions(&self) -> Vec<(AgentId, AgentId)> {
        let polygons: Vec<(AgentId, Polygon2d)> = self
            .agents
            .values()
            .map(|agent| (agent.id, agent.polygon()))
            .collect();

        let mut pairs = Vec::new();
        for (i, (a, poly_a)) in polygons.iter().enumerate() {
            for (b, poly_b) in &polygons[i + 1..] {
                if poly_a.intersects(poly_b) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }

    /// True when agent `id` exists and stands inside its goal polygon.
    pub fn goal_reached(&self, id: AgentId) -> bool {
        self.agents.get(&id).is_some_and(Agent::at_goal)
    }

    /// Map extent merged with every agent footprint.
    pub fn bounding_box(&self) -> BoundingBox {
        self.agents
            .values()
            .filter_map(|agent| agent.polygon().bounding_box())
            .fold(self.map.bounding_box(), |bb, agent_bb| bb.merge(&agent_bb))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::behavior::{BehaviorConstantVelocity, BehaviorIDMClassic, BehaviorModel};
    use crate::dynamic::{make_state, StateDefinition};
    use crate::execution::ExecutionModelInterpolate;
    use crate::geometry::point;
    use crate::map::tests::straight_map;
    use crate::map::{LaneDescription, MapDescription};
    use crate::params::ParameterServer;
    use approx::assert_relative_eq;

    pub(crate) fn straight_world() -> World {
        World::new(Arc::new(straight_map()))
    }

    /// Two single-lane roads crossing at the origin: lane 1 eastbound along
    /// y=0, lane 2 northbound along x=0.
    pub(crate) fn crossing_world() -> World {
        let map = MapInterface::new(MapDescription {
            name: "crossing".to_string(),
            lanes: vec![
                LaneDescription {
                    id: 1,
                    center_line: vec![[-50.0, 0.0], [50.0, 0.0]],
                    width: 3.5,
                    successors: vec![],
                },
                LaneDescription {
                    id: 2,
                    center_line: vec![[0.0, -50.0], [0.0, 50.0]],
                    width: 3.5,
                    successors: vec![],
                },
            ],
        })
        .unwrap();
        World::new(Arc::new(map))
    }

    /// Places an agent at arc length `s` on the corridor routed from `from` to `to`.
    pub(crate) fn spawn_on(
        world: &mut World,
        id: AgentId,
        from: (f64, f64),
        to: (f64, f64),
        s: f64,
        vel: f64,
        behavior: Box<dyn BehaviorModel>,
    ) {
        let corridor = world
            .map()
            .lane_corridor(point(from.0, from.1), point(to.0, to.1))
            .unwrap();
        let p = corridor.center_line().point_at_s(s);
        let theta = corridor.center_line().angle_at_s(s);
        let state = make_state(world.time(), p.x, p.y, theta, vel);
        let agent = Agent::new(
            id,
            state,
            behavior,
            Box::new(ExecutionModelInterpolate::new()),
            Arc::new(corridor),
        );
        world.add_agent(agent).unwrap();
    }

    /// Places an agent on the straight road corridor, lanes 1 and 2.
    pub(crate) fn spawn(world: &mut World, id: AgentId, s: f64, vel: f64, behavior: Box<dyn BehaviorModel>) {
        spawn_on(world, id, (10.0, 0.0), (90.0, 0.0), s, vel, behavior);
    }

    #[test]
    fn test_step_moves_agents_and_time() {
        let params = ParameterServer::new();
        let mut world = straight_world();
        spawn(&mut world, 1, 10.0, 10.0, Box::new(BehaviorIDMClassic::new(&params)));
        spawn(&mut world, 2, 40.0, 10.0, Box::new(BehaviorIDMClassic::new(&params)));

        for _ in 0..5 {
            world.step(0.2).unwrap();
        }

        assert_relative_eq!(world.time(), 1.0, epsilon = 1e-12);
        let a1 = world.agent(1).unwrap();
        let a2 = world.agent(2).unwrap();
        assert_eq!(a1.history().len(), 5);
        assert!(a1.state[StateDefinition::X_POSITION] > 19.0);
        assert!(a2.state[StateDefinition::X_POSITION] > a1.state[StateDefinition::X_POSITION]);
        assert_relative_eq!(a1.state[StateDefinition::TIME_POSITION], 1.0, epsilon = 1e-12);
        assert_relative_eq!(a1.state[StateDefinition::Y_POSITION], 0.0);
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let params = ParameterServer::new();
        let mut world = straight_world();
        spawn(&mut world, 1, 10.0, 10.0, Box::new(BehaviorConstantVelocity::new(&params)));

        let copy = world.agent(1).unwrap().clone();
        assert!(matches!(world.add_agent(copy), Err(CoreError::DuplicateAgent(1))));
        assert!(world.remove_agent(1).is_some());
        assert!(world.is_empty());
    }

    #[test]
    fn test_agent_removed_at_corridor_end() {
        let params = ParameterServer::new();
        let mut world = straight_world();
        spawn(&mut world, 1, 99.5, 10.0, Box::new(BehaviorConstantVelocity::new(&params)));
        spawn(&mut world, 2, 50.0, 10.0, Box::new(BehaviorConstantVelocity::new(&params)));

        world.step(0.2).unwrap();

        assert!(world.agent(1).is_none());
        assert!(world.agent(2).is_some());
    }

    #[test]
    fn test_collisions() {
        let params = ParameterServer::new();
        let mut world = straight_world();
        spawn(&mut world, 1, 10.0, 0.0, Box::new(BehaviorConstantVelocity::new(&params)));
        spawn(&mut world, 2, 12.0, 0.0, Box::new(BehaviorConstantVelocity::new(&params)));
        spawn(&mut world, 3, 60.0, 0.0, Box::new(BehaviorConstantVelocity::new(&params)));

        assert_eq!(world.collisions(), vec![(1, 2)]);
    }

    #[test]
    fn test_goal_reached() {
        let params = ParameterServer::new();
        let mut world = straight_world();
        spawn(&mut world, 1, 50.0, 0.0, Box::new(BehaviorConstantVelocity::new(&params)));
        spawn(&mut world, 2, 20.0, 0.0, Box::new(BehaviorConstantVelocity::new(&params)));
        for id in [1, 2] {
            world.agent_mut(id).unwrap().goal = Some(GoalDefinitionPolygon::around(point(50.0, 0.0), 2.0));
        }

        assert!(world.goal_reached(1));
        assert!(!world.goal_reached(2));
        assert!(!world.goal_reached(99));
    }

    #[test]
    fn test_world_queries() {
        let params = ParameterServer::new();
        let mut world = straight_world();
        spawn(&mut world, 1, 10.0, 0.0, Box::new(BehaviorConstantVelocity::new(&params)));

        let bb = world.bounding_box();
        assert_relative_eq!(bb.min.x, -1.75);
        assert_relative_eq!(bb.max.x, 101.75);

        let area = Polygon2d::from_points(vec![
            point(0.0, -1.0),
            point(12.0, -1.0),
            point(12.0, 1.0),
            point(0.0, 1.0),
        ]);
        assert_eq!(world.agents_intersecting_polygon(&area), vec![1]);
    }
}
