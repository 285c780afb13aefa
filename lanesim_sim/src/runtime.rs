//! Runtime: steps scenarios from a generator and renders them.
//!
//! ```text
//!   RuntimeBuilder ──build()──▶ Configured ──reset()──▶ Running ──step()*──▶ Finished
//!                                                          ▲                    │
//!                                                          └──────reset()───────┘
//! ```

use crate::error::SimError;
use crate::generation::ScenarioGeneration;
use crate::scenario::Scenario;
use crate::viewer::Viewer;
use lanesim_core::World;
use tracing::{debug, info};

/// Lifecycle of a [`Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Built, no scenario loaded yet
    Configured,
    /// A scenario world is loaded and can be stepped
    Running,
    /// The world ran out of agents
    Finished,
}

/// Collects runtime settings; [`build`](RuntimeBuilder::build) requires a
/// scenario generator.
pub struct RuntimeBuilder<V> {
    step_time: f64,
    viewer: V,
    scenario_generator: Option<Box<dyn ScenarioGeneration>>,
    render: bool,
}

impl<V: Viewer> RuntimeBuilder<V> {
    pub fn step_time(mut self, step_time: f64) -> Self {
        self.step_time = step_time;
        self
    }

    pub fn scenario_generator(mut self, generator: impl ScenarioGeneration + 'static) -> Self {
        self.scenario_generator = Some(Box::new(generator));
        self
    }

    pub fn render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    pub fn build(self) -> Result<Runtime<V>, SimError> {
        let scenario_generator = self.scenario_generator.ok_or(SimError::MissingGenerator)?;
        if !(self.step_time.is_finite() && self.step_time > 0.0) {
            return Err(SimError::config(format!("step_time must be positive, got {}", self.step_time)));
        }
        Ok(Runtime {
            step_time: self.step_time,
            viewer: self.viewer,
            scenario_generator,
            render: self.render,
            state: RuntimeState::Configured,
            scenario: None,
            scenario_idx: 0,
            world: None,
        })
    }
}

pub struct Runtime<V> {
    step_time: f64,
    viewer: V,
    scenario_generator: Box<dyn ScenarioGeneration>,
    render: bool,
    state: RuntimeState,
    scenario: Option<Scenario>,
    scenario_idx: usize,
    world: Option<World>,
}

impl<V: Viewer> Runtime<V> {
    /// Starts a builder with a 0.2 s step and rendering enabled.
    pub fn builder(viewer: V) -> RuntimeBuilder<V> {
        RuntimeBuilder {
            step_time: 0.2,
            viewer,
            scenario_generator: None,
            render: true,
        }
    }

    pub fn state(&self) -> RuntimeState {
        self.state
    }

    pub fn step_time(&self) -> f64 {
        self.step_time
    }

    pub fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    pub fn scenario_idx(&self) -> usize {
        self.scenario_idx
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    pub fn into_viewer(self) -> V {
        self.viewer
    }

    /// Loads the generator's next scenario. Valid in any state.
    pub fn reset(&mut self) -> Result<(), SimError> {
        let (scenario, idx) = self.scenario_generator.get_next_scenario();
        self.load(scenario, idx);
        Ok(())
    }

    fn load(&mut self, scenario: Scenario, idx: usize) {
        info!("Loading scenario {} with {} agents", idx, scenario.num_agents());
        self.world = Some(scenario.get_world_state());
        self.scenario = Some(scenario);
        self.scenario_idx = idx;
        self.state = RuntimeState::Running;
    }

    /// Advances the world by one step and renders it when enabled.
    pub fn step(&mut self) -> Result<RuntimeState, SimError> {
        if self.state != RuntimeState::Running {
            return Err(SimError::NotRunning);
        }
        let (Some(world), Some(scenario)) = (self.world.as_mut(), self.scenario.as_ref()) else {
            return Err(SimError::NotRunning);
        };

        world.step(self.step_time)?;
        if self.render {
            self.viewer
                .draw_world(world, scenario.eval_agent_ids(), self.scenario_idx)?;
            self.viewer.clear();
        }

        if world.is_empty() {
            debug!("Scenario {} finished at t={:.2}s", self.scenario_idx, world.time());
            self.state = RuntimeState::Finished;
        }
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{ConfigWithEase, LaneCorridorConfig};
    use crate::test_support::{three_way_map_path, RecordingViewer};
    use approx::assert_relative_eq;
    use lanesim_core::behavior::BehaviorConstantVelocity;
    use lanesim_core::geometry::point;
    use lanesim_core::ParameterServer;

    fn generator(s_min: f64, s_max: f64) -> ConfigWithEase {
        let params = ParameterServer::new();
        let config = LaneCorridorConfig::new(
            point(-20.0, -2.0),
            point(20.0, -2.0),
            Box::new(BehaviorConstantVelocity::new(&params)),
        )
        .with_s_range(s_min, s_max)
        .with_controlled_ids(true);
        ConfigWithEase::new(2, three_way_map_path(), 0, &[config]).unwrap()
    }

    #[test]
    fn test_build_requires_generator() {
        let result = Runtime::builder(RecordingViewer::default()).build();
        assert!(matches!(result, Err(SimError::MissingGenerator)));
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut runtime = Runtime::builder(RecordingViewer::default())
            .scenario_generator(generator(0.0, 25.0))
            .build()
            .unwrap();

        assert_eq!(runtime.state(), RuntimeState::Configured);
        assert!(matches!(runtime.step(), Err(SimError::NotRunning)));
    }

    #[test]
    fn test_step_renders_and_advances() {
        let mut runtime = Runtime::builder(RecordingViewer::default())
            .step_time(0.2)
            .scenario_generator(generator(0.0, 25.0))
            .render(true)
            .build()
            .unwrap();

        runtime.reset().unwrap();
        assert_eq!(runtime.state(), RuntimeState::Running);
        for _ in 0..3 {
            assert_eq!(runtime.step().unwrap(), RuntimeState::Running);
        }

        assert_relative_eq!(runtime.world().unwrap().time(), 0.6, epsilon = 1e-12);
        let viewer = runtime.viewer();
        assert_eq!(viewer.draws.len(), 3);
        assert_eq!(viewer.clears, 3);
        assert_eq!(viewer.draws[0].eval_agent_ids.len(), 1);
        assert!(viewer.draws[0].num_agents >= 2);

        runtime.reset().unwrap();
        assert_eq!(runtime.scenario_idx(), 1);
        assert_relative_eq!(runtime.world().unwrap().time(), 0.0);
    }

    #[test]
    fn test_render_disabled() {
        let mut runtime = Runtime::builder(RecordingViewer::default())
            .scenario_generator(generator(0.0, 25.0))
            .render(false)
            .build()
            .unwrap();
        runtime.reset().unwrap();
        runtime.step().unwrap();
        assert!(runtime.viewer().draws.is_empty());
    }

    #[test]
    fn test_empty_world_finishes() {
        // a single agent 1 m before the corridor end leaves after one step
        let mut runtime = Runtime::builder(RecordingViewer::default())
            .scenario_generator(generator(79.0, 79.5))
            .build()
            .unwrap();
        runtime.reset().unwrap();

        assert_eq!(runtime.step().unwrap(), RuntimeState::Finished);
        assert!(matches!(runtime.step(), Err(SimError::NotRunning)));

        runtime.reset().unwrap();
        assert_eq!(runtime.state(), RuntimeState::Running);
    }
}
