//! A generated scenario: an initial world plus the agents under evaluation.

use lanesim_core::{AgentId, World};

#[derive(Debug, Clone)]
pub struct Scenario {
    world: World,
    eval_agent_ids: Vec<AgentId>,
}

impl Scenario {
    pub fn new(world: World, eval_agent_ids: Vec<AgentId>) -> Self {
        Self { world, eval_agent_ids }
    }

    /// A fresh copy of the initial world; stepping it leaves the scenario untouched.
    pub fn get_world_state(&self) -> World {
        self.world.clone()
    }

    pub fn eval_agent_ids(&self) -> &[AgentId] {
        &self.eval_agent_ids
    }

    pub fn num_agents(&self) -> usize {
        self.world.agents().len()
    }
}
