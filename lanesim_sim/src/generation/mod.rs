//! Scenario generators.
//!
//! Generators build all of their scenarios up front from a seed, so the
//! same seed and configuration always yield the same scenarios.

mod config_with_ease;
mod configurable;

pub use config_with_ease::{ConfigWithEase, LaneCorridorConfig};
pub use configurable::{ConfigurableScenarioGeneration, ControlledAgents, SinkSourceConfig};

use crate::error::SimError;
use crate::scenario::Scenario;
use tracing::warn;

/// Pre-generated scenarios with a cursor for sequential access.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
    current: usize,
}

impl ScenarioSet {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, SimError> {
        if scenarios.is_empty() {
            return Err(SimError::config("number of scenarios must be positive"));
        }
        Ok(Self { scenarios, current: 0 })
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Scenario> {
        self.scenarios.get(idx)
    }

    /// Returns the scenario under the cursor and advances it, wrapping to
    /// the first scenario after the last one.
    pub fn next_scenario(&mut self) -> (Scenario, usize) {
        if self.current >= self.scenarios.len() {
            warn!("All {} scenarios used, wrapping around to the first", self.scenarios.len());
            self.current = 0;
        }
        let idx = self.current;
        self.current += 1;
        (self.scenarios[idx].clone(), idx)
    }
}

/// Source of scenarios for drivers and the runtime.
pub trait ScenarioGeneration {
    fn scenario_set(&self) -> &ScenarioSet;

    fn scenario_set_mut(&mut self) -> &mut ScenarioSet;

    fn get_next_scenario(&mut self) -> (Scenario, usize) {
        self.scenario_set_mut().next_scenario()
    }

    fn get_scenario(&self, idx: usize) -> Option<&Scenario> {
        self.scenario_set().get(idx)
    }

    fn num_scenarios(&self) -> usize {
        self.scenario_set().len()
    }
}
