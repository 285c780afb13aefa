use super::{ScenarioGeneration, ScenarioSet};
use crate::error::SimError;
use crate::scenario::Scenario;
use lanesim_core::dynamic::make_state;
use lanesim_core::geometry::Point2d;
use lanesim_core::{Agent, AgentId, BehaviorModel, ExecutionModelKind, GoalDefinitionPolygon, MapInterface, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Half edge length (m) of the square goal placed on each corridor sink.
pub const GOAL_HALF_SIZE: f64 = 2.0;

/// How agents are placed along one source-to-sink corridor.
#[derive(Debug, Clone)]
pub struct LaneCorridorConfig {
    /// Point near the first lane of the corridor
    pub source: Point2d,
    /// Point near the last lane of the corridor
    pub sink: Point2d,
    /// Prototype cloned into every agent of this corridor
    pub behavior_model: Box<dyn BehaviorModel>,
    pub execution_model: ExecutionModelKind,
    /// Arc length of the first agent
    pub s_min: f64,
    /// No agent is placed beyond this arc length
    pub s_max: f64,
    /// `s_min` and `s_max` are fractions of the corridor length
    pub relative_s: bool,
    /// Gap between consecutive agents (m)
    pub ds_range: (f64, f64),
    /// Initial speed (m/s)
    pub velocity_range: (f64, f64),
    /// Mark one agent of this corridor for evaluation
    pub controlled_ids: bool,
}

impl LaneCorridorConfig {
    pub fn new(source: Point2d, sink: Point2d, behavior_model: Box<dyn BehaviorModel>) -> Self {
        Self {
            source,
            sink,
            behavior_model,
            execution_model: ExecutionModelKind::ExecutionModelInterpolate,
            s_min: 0.0,
            s_max: f64::INFINITY,
            relative_s: false,
            ds_range: (10.0, 20.0),
            velocity_range: (10.0, 15.0),
            controlled_ids: false,
        }
    }

    pub fn with_s_range(mut self, s_min: f64, s_max: f64) -> Self {
        self.s_min = s_min;
        self.s_max = s_max;
        self
    }

    pub fn with_controlled_ids(mut self, controlled_ids: bool) -> Self {
        self.controlled_ids = controlled_ids;
        self
    }

    fn validate(&self) -> Result<(), SimError> {
        let ordered = |(lo, hi): (f64, f64)| lo.is_finite() && hi.is_finite() && lo <= hi;
        if !ordered(self.ds_range) || self.ds_range.0 <= 0.0 {
            return Err(SimError::config(format!("ds_range {:?} must be positive and ordered", self.ds_range)));
        }
        if !ordered(self.velocity_range) || self.velocity_range.0 < 0.0 {
            return Err(SimError::config(format!(
                "velocity_range {:?} must be non-negative and ordered",
                self.velocity_range
            )));
        }
        if self.s_min > self.s_max {
            return Err(SimError::config(format!("s range [{}, {}] is empty", self.s_min, self.s_max)));
        }
        Ok(())
    }

    fn s_bounds(&self, corridor_length: f64) -> (f64, f64) {
        if self.relative_s {
            (self.s_min * corridor_length, self.s_max * corridor_length)
        } else {
            (self.s_min, self.s_max)
        }
    }
}

fn uniform(rng: &mut ChaCha8Rng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// Generates scenarios by filling lane corridors with evenly spread agents.
#[derive(Debug, Clone)]
pub struct ConfigWithEase {
    map: Arc<MapInterface>,
    random_seed: u64,
    scenarios: ScenarioSet,
}

impl ConfigWithEase {
    /// Loads the map from `map_file` and generates `num_scenarios` scenarios.
    pub fn new(
        num_scenarios: usize,
        map_file: impl AsRef<Path>,
        random_seed: u64,
        lane_corridor_configs: &[LaneCorridorConfig],
    ) -> Result<Self, SimError> {
        let map = Arc::new(MapInterface::from_file(map_file.as_ref())?);
        info!("Loaded map '{}' from {}", map.name(), map_file.as_ref().display());
        Self::from_map(num_scenarios, map, random_seed, lane_corridor_configs)
    }

    pub fn from_map(
        num_scenarios: usize,
        map: Arc<MapInterface>,
        random_seed: u64,
        lane_corridor_configs: &[LaneCorridorConfig],
    ) -> Result<Self, SimError> {
        for config in lane_corridor_configs {
            config.validate()?;
        }
        let scenarios = (0..num_scenarios)
            .map(|idx| Self::create_scenario(&map, random_seed, idx, lane_corridor_configs))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            map,
            random_seed,
            scenarios: ScenarioSet::new(scenarios)?,
        })
    }

    pub fn map(&self) -> &Arc<MapInterface> {
        &self.map
    }

    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }

    fn create_scenario(
        map: &Arc<MapInterface>,
        random_seed: u64,
        idx: usize,
        configs: &[LaneCorridorConfig],
    ) -> Result<Scenario, SimError> {
        let mut rng = ChaCha8Rng::seed_from_u64(random_seed.wrapping_add(idx as u64));
        let mut world = World::new(Arc::clone(map));
        let mut eval_agent_ids = Vec::new();
        let mut next_id: AgentId = 0;

        for config in configs {
            let agents = Self::populate_corridor(map, config, &mut rng, &mut next_id)?;
            if config.controlled_ids && !agents.is_empty() {
                eval_agent_ids.push(agents[rng.gen_range(0..agents.len())].id);
            }
            for agent in agents {
                world.add_agent(agent)?;
            }
        }

        debug!(
            "Scenario {}: {} agents, eval agents {:?}",
            idx,
            world.agents().len(),
            eval_agent_ids
        );
        Ok(Scenario::new(world, eval_agent_ids))
    }

    fn populate_corridor(
        map: &MapInterface,
        config: &LaneCorridorConfig,
        rng: &mut ChaCha8Rng,
        next_id: &mut AgentId,
    ) -> Result<Vec<Agent>, SimError> {
        let corridor = Arc::new(map.lane_corridor(config.source, config.sink)?);
        let length = corridor.length();
        let (s_min, s_max) = config.s_bounds(length);
        let goal = GoalDefinitionPolygon::around(config.sink, GOAL_HALF_SIZE);

        let mut agents = Vec::new();
        let mut s = s_min.max(0.0);
        while s <= s_max && s <= length {
            let line = corridor.center_line();
            let p = line.point_at_s(s);
            let velocity = uniform(rng, config.velocity_range);
            let state = make_state(0.0, p.x, p.y, line.angle_at_s(s), velocity);

            let agent = Agent::new(
                *next_id,
                state,
                config.behavior_model.clone(),
                config.execution_model.build(),
                Arc::clone(&corridor),
            )
            .with_goal(goal.clone());
            agents.push(agent);
            *next_id += 1;

            s += uniform(rng, config.ds_range);
        }
        Ok(agents)
    }
}

impl ScenarioGeneration for ConfigWithEase {
    fn scenario_set(&self) -> &ScenarioSet {
        &self.scenarios
    }

    fn scenario_set_mut(&mut self) -> &mut ScenarioSet {
        &mut self.scenarios
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::three_way_map_path;
    use lanesim_core::behavior::BehaviorIDMClassic;
    use lanesim_core::geometry::point;
    use lanesim_core::{ParameterServer, StateDefinition};

    fn straight_config(params: &ParameterServer) -> LaneCorridorConfig {
        LaneCorridorConfig::new(point(-20.0, -2.0), point(20.0, -2.0), Box::new(BehaviorIDMClassic::new(params)))
            .with_s_range(0.0, 25.0)
    }

    #[test]
    fn test_agents_spread_along_corridor() {
        let params = ParameterServer::new();
        let generator = ConfigWithEase::new(2, three_way_map_path(), 0, &[straight_config(&params)]).unwrap();
        let scenario = generator.get_scenario(0).unwrap();
        let world = scenario.get_world_state();

        // first agent at s=0, gaps of 10-20 m up to s=25: two or three agents
        let n = world.agents().len();
        assert!((2..=3).contains(&n), "unexpected agent count {}", n);

        let xs: Vec<f64> = world
            .agents()
            .values()
            .map(|a| a.state[StateDefinition::X_POSITION])
            .collect();
        assert_eq!(xs[0], -40.0);
        for pair in xs.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((10.0..20.0).contains(&gap), "gap {}", gap);
        }
        for agent in world.agents().values() {
            let v = agent.state[StateDefinition::VEL_POSITION];
            assert!((10.0..15.0).contains(&v));
            assert!(agent.goal.is_some());
        }
        assert!(scenario.eval_agent_ids().is_empty());
    }

    #[test]
    fn test_same_seed_same_scenarios() {
        let params = ParameterServer::new();
        let configs = [straight_config(&params).with_controlled_ids(true)];
        let a = ConfigWithEase::new(3, three_way_map_path(), 7, &configs).unwrap();
        let b = ConfigWithEase::new(3, three_way_map_path(), 7, &configs).unwrap();

        for idx in 0..3 {
            let (sa, sb) = (a.get_scenario(idx).unwrap(), b.get_scenario(idx).unwrap());
            assert_eq!(sa.eval_agent_ids(), sb.eval_agent_ids());
            assert_eq!(sa.eval_agent_ids().len(), 1);
            let states_a: Vec<_> = sa.get_world_state().agents().values().map(|ag| ag.state).collect();
            let states_b: Vec<_> = sb.get_world_state().agents().values().map(|ag| ag.state).collect();
            assert_eq!(states_a, states_b);
        }
    }

    #[test]
    fn test_unique_ids_across_corridors() {
        let params = ParameterServer::new();
        let configs = [
            straight_config(&params),
            LaneCorridorConfig::new(point(20.0, 2.0), point(-20.0, 2.0), Box::new(BehaviorIDMClassic::new(&params)))
                .with_s_range(5.0, 25.0),
        ];
        let generator = ConfigWithEase::new(1, three_way_map_path(), 0, &configs).unwrap();
        let scenario = generator.get_scenario(0).unwrap();

        let ids: Vec<AgentId> = scenario.get_world_state().agents().keys().copied().collect();
        let expected: Vec<AgentId> = (0..ids.len() as AgentId).collect();
        assert_eq!(ids, expected);
        assert!(ids.len() >= 4);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let params = ParameterServer::new();
        let mut config = straight_config(&params);
        config.ds_range = (0.0, 5.0);
        assert!(matches!(
            ConfigWithEase::new(1, three_way_map_path(), 0, &[config]),
            Err(SimError::Config(_))
        ));

        let reversed = straight_config(&params).with_s_range(30.0, 10.0);
        assert!(ConfigWithEase::new(1, three_way_map_path(), 0, &[reversed]).is_err());
    }

    #[test]
    fn test_unroutable_corridor_is_map_error() {
        let params = ParameterServer::new();
        let against_flow =
            LaneCorridorConfig::new(point(20.0, -2.0), point(-20.0, -2.0), Box::new(BehaviorIDMClassic::new(&params)));
        assert!(matches!(
            ConfigWithEase::new(1, three_way_map_path(), 0, &[against_flow]),
            Err(SimError::Map(_))
        ));
    }
}
