use super::config_with_ease::{ConfigWithEase, LaneCorridorConfig};
use super::{ScenarioGeneration, ScenarioSet};
use crate::error::SimError;
use lanesim_core::geometry::point;
use lanesim_core::{behavior_from_name, CoreError, ExecutionModelKind, MapInterface, ParameterServer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const GENERATION_KEY: &str = "Scenario::Generation::ConfigurableScenarioGeneration";
const DEFAULT_MAP_FILENAME: &str = "demos/data/three_way_plain.json";

/// Which agents of a source/sink entry are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlledAgents {
    #[default]
    NoneControlled,
    RandomSingleAgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentStatesGeometries {
    #[serde(default = "default_distance_range")]
    pub vehicle_distance_range: [f64; 2],
    #[serde(default = "default_velocity_range")]
    pub other_vehicle_velocity_range: [f64; 2],
    /// Fractions of the corridor length
    #[serde(default = "default_s_range")]
    pub s_range: [f64; 2],
}

impl Default for AgentStatesGeometries {
    fn default() -> Self {
        Self {
            vehicle_distance_range: default_distance_range(),
            other_vehicle_velocity_range: default_velocity_range(),
            s_range: default_s_range(),
        }
    }
}

fn default_distance_range() -> [f64; 2] {
    [10.0, 20.0]
}

fn default_velocity_range() -> [f64; 2] {
    [10.0, 15.0]
}

fn default_s_range() -> [f64; 2] {
    [0.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelTypeConfig {
    pub model_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlledAgentsConfig {
    #[serde(rename = "Type", default)]
    pub kind: ControlledAgents,
}

/// One entry of the `SinksSources` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SinkSourceConfig {
    /// `[[source_x, source_y], [sink_x, sink_y]]`
    pub source_sink: [[f64; 2]; 2],
    #[serde(default)]
    pub description: String,
    pub config_behavior_models: ModelTypeConfig,
    #[serde(default)]
    pub config_execution_models: Option<ModelTypeConfig>,
    #[serde(default)]
    pub config_agent_states_geometries: AgentStatesGeometries,
    #[serde(default)]
    pub config_controlled_agents: ControlledAgentsConfig,
}

impl SinkSourceConfig {
    fn to_lane_corridor_config(&self, params: &ParameterServer) -> Result<LaneCorridorConfig, SimError> {
        let [source, sink] = self.source_sink;
        let behavior = behavior_from_name(&self.config_behavior_models.model_type, params).map_err(CoreError::from)?;
        let execution_model = match &self.config_execution_models {
            Some(config) => config
                .model_type
                .parse::<ExecutionModelKind>()
                .map_err(|e| SimError::config(e.to_string()))?,
            None => ExecutionModelKind::ExecutionModelInterpolate,
        };
        let geometries = &self.config_agent_states_geometries;
        let [ds_min, ds_max] = geometries.vehicle_distance_range;
        let [v_min, v_max] = geometries.other_vehicle_velocity_range;
        let [s_min, s_max] = geometries.s_range;

        let mut config = LaneCorridorConfig::new(point(source[0], source[1]), point(sink[0], sink[1]), behavior)
            .with_s_range(s_min, s_max)
            .with_controlled_ids(self.config_controlled_agents.kind == ControlledAgents::RandomSingleAgent);
        config.execution_model = execution_model;
        config.relative_s = true;
        config.ds_range = (ds_min, ds_max);
        config.velocity_range = (v_min, v_max);
        Ok(config)
    }
}

/// Scenario generation driven entirely by the parameter tree under
/// `Scenario::Generation::ConfigurableScenarioGeneration`.
#[derive(Debug, Clone)]
pub struct ConfigurableScenarioGeneration {
    sinks_sources: Vec<SinkSourceConfig>,
    inner: ConfigWithEase,
}

impl ConfigurableScenarioGeneration {
    pub fn new(num_scenarios: usize, random_seed: u64, params: &ParameterServer) -> Result<Self, SimError> {
        let generation = params.child(GENERATION_KEY);
        let map_filename = generation.get_string("MapFilename", "Path to the map file", DEFAULT_MAP_FILENAME);
        let raw = generation
            .get_raw("SinksSources")
            .ok_or_else(|| SimError::config(format!("{}::SinksSources is not set", GENERATION_KEY)))?;
        let sinks_sources: Vec<SinkSourceConfig> =
            serde_json::from_value(raw).map_err(|e| SimError::config(format!("SinksSources: {}", e)))?;
        if sinks_sources.is_empty() {
            return Err(SimError::config("SinksSources is empty"));
        }

        let configs = sinks_sources
            .iter()
            .map(|entry| entry.to_lane_corridor_config(params))
            .collect::<Result<Vec<_>, _>>()?;
        for entry in &sinks_sources {
            info!("Configured source/sink '{}'", entry.description);
        }

        let map = Arc::new(MapInterface::from_file(&map_filename)?);
        let inner = ConfigWithEase::from_map(num_scenarios, map, random_seed, &configs)?;
        Ok(Self { sinks_sources, inner })
    }

    pub fn sinks_sources(&self) -> &[SinkSourceConfig] {
        &self.sinks_sources
    }
}

impl ScenarioGeneration for ConfigurableScenarioGeneration {
    fn scenario_set(&self) -> &ScenarioSet {
        self.inner.scenario_set()
    }

    fn scenario_set_mut(&mut self) -> &mut ScenarioSet {
        self.inner.scenario_set_mut()
    }
}
