//! Shared fixtures and recording stand-ins for tests.

use crate::error::ViewerError;
use crate::generation::{ConfigWithEase, LaneCorridorConfig, ScenarioGeneration};
use crate::viewer::{FrameSource, VideoEncoder, Viewer};
use lanesim_core::behavior::BehaviorConstantVelocity;
use lanesim_core::geometry::point;
use lanesim_core::{AgentId, ParameterServer, World};
use lanesim_env::SimClock;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn three_way_map_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/data/three_way_plain.json")
}

/// Eastbound corridor of the three-way map with constant-velocity agents
/// between s=20 and s=45, one of them evaluated.
pub(crate) fn straight_scenario_world() -> (World, Vec<AgentId>) {
    let params = ParameterServer::new();
    let config = LaneCorridorConfig::new(
        point(-20.0, -2.0),
        point(20.0, -2.0),
        Box::new(BehaviorConstantVelocity::new(&params)),
    )
    .with_s_range(20.0, 45.0)
    .with_controlled_ids(true);
    let generator = ConfigWithEase::new(1, three_way_map_path(), 0, &[config]).unwrap();
    let scenario = generator.get_scenario(0).unwrap();
    (scenario.get_world_state(), scenario.eval_agent_ids().to_vec())
}

/// Configurable generation over the three-way map: eastbound with one
/// evaluated agent, westbound uncontrolled.
pub(crate) fn configurable_params() -> ParameterServer {
    let entry = |source: [f64; 2], sink: [f64; 2], description: &str, controlled: &str| {
        json!({
            "SourceSink": [source, sink],
            "Description": description,
            "ConfigBehaviorModels": {"ModelType": "BehaviorIDMClassic"},
            "ConfigExecutionModels": {"ModelType": "ExecutionModelInterpolate"},
            "ConfigAgentStatesGeometries": {
                "VehicleDistanceRange": [10.0, 15.0],
                "OtherVehicleVelocityRange": [5.0, 7.0],
                "SRange": [0.1, 0.5]
            },
            "ConfigControlledAgents": {"Type": controlled}
        })
    };
    let value = json!({
        "Scenario": {"Generation": {"ConfigurableScenarioGeneration": {
            "MapFilename": three_way_map_path(),
            "SinksSources": [
                entry([-20.0, -2.0], [20.0, -2.0], "eastbound", "RandomSingleAgent"),
                entry([20.0, 2.0], [-20.0, 2.0], "westbound", "NoneControlled")
            ]
        }}},
        "simulation": {"step_time": 0.2, "real_time_factor": 1.0}
    });
    ParameterServer::from_value(value).unwrap()
}

#[derive(Debug, Clone)]
pub(crate) struct DrawRecord {
    pub scenario_idx: usize,
    pub time: f64,
    pub num_agents: usize,
    pub eval_agent_ids: Vec<AgentId>,
}

/// Viewer that records every call.
#[derive(Debug, Default)]
pub(crate) struct RecordingViewer {
    pub draws: Vec<DrawRecord>,
    pub clears: usize,
}

impl Viewer for RecordingViewer {
    fn draw_world(&mut self, world: &World, eval_agent_ids: &[AgentId], scenario_idx: usize) -> Result<(), ViewerError> {
        self.draws.push(DrawRecord {
            scenario_idx,
            time: world.time(),
            num_agents: world.agents().len(),
            eval_agent_ids: eval_agent_ids.to_vec(),
        });
        Ok(())
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

impl FrameSource for RecordingViewer {
    fn save_frame(&self, path: &Path) -> Result<(), ViewerError> {
        std::fs::write(path, format!("frame {}", self.draws.len()))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EncodeCall {
    pub frame_pattern: PathBuf,
    pub framerate: f64,
    pub output: PathBuf,
}

/// Encoder that records its calls instead of running a process.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingEncoder {
    calls: Arc<Mutex<Vec<EncodeCall>>>,
}

impl RecordingEncoder {
    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl VideoEncoder for RecordingEncoder {
    fn encode(&self, frame_pattern: &Path, framerate: f64, output: &Path) -> Result<(), ViewerError> {
        self.calls.lock().unwrap().push(EncodeCall {
            frame_pattern: frame_pattern.to_path_buf(),
            framerate,
            output: output.to_path_buf(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    /// Scenario index of the drawn world
    Draw(usize),
    Clear,
    Sleep(Duration),
}

/// Viewer and clock writing to one shared log, so tests can check how
/// drawing and pacing interleave.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Viewer for EventLog {
    fn draw_world(&mut self, _world: &World, _eval_agent_ids: &[AgentId], scenario_idx: usize) -> Result<(), ViewerError> {
        self.push(Event::Draw(scenario_idx));
        Ok(())
    }

    fn clear(&mut self) {
        self.push(Event::Clear);
    }
}

impl SimClock for EventLog {
    fn now(&self) -> Duration {
        self.events()
            .iter()
            .filter_map(|e| match e {
                Event::Sleep(d) => Some(*d),
                _ => None,
            })
            .sum()
    }

    fn sleep(&self, duration: Duration) {
        self.push(Event::Sleep(duration));
    }
}
