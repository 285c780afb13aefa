//! Three-way intersection with rule-based agents yielding to crossing traffic.

use super::simulation_timing;
use crate::error::SimError;
use crate::generation::{ConfigWithEase, LaneCorridorConfig};
use crate::runtime::{Runtime, RuntimeState};
use crate::viewer::Viewer;
use lanesim_core::behavior::BehaviorIntersectionRuleBased;
use lanesim_core::geometry::point;
use lanesim_core::ParameterServer;
use lanesim_env::{pacing_interval, SimClock};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Map used by the intersection scenario, relative to the workspace root.
pub const INTERSECTION_MAP: &str = "demos/data/three_way_plain.json";

#[derive(Debug, Clone)]
pub struct IntersectionOptions {
    pub map_file: PathBuf,
    pub num_scenarios: usize,
    pub random_seed: u64,
    pub num_runs: usize,
    pub num_steps: usize,
    /// Overrides `simulation::real_time_factor` when set
    pub real_time_factor: Option<f64>,
}

impl Default for IntersectionOptions {
    fn default() -> Self {
        Self {
            map_file: PathBuf::from(INTERSECTION_MAP),
            num_scenarios: 3,
            random_seed: 0,
            num_runs: 1,
            num_steps: 50,
            real_time_factor: None,
        }
    }
}

/// Parameters tuned for slow, cautious intersection traffic.
pub fn intersection_params() -> Result<ParameterServer, SimError> {
    let params = ParameterServer::new();
    params.set("BehaviorIDMLaneTracking::CrosstrackErrorGain", 2.5)?;
    params.set("BehaviorIDMClassic::DesiredVelocity", 5.0)?;
    params.set("BehaviorIntersectionRuleBased::BrakingDistance", 20.0)?;
    params.set("BehaviorIntersectionRuleBased::PredictionTimeHorizon", 3.0)?;
    Ok(params)
}

/// Eastbound and westbound through traffic plus a northbound left turn,
/// whose agents are evaluated.
pub fn intersection_lane_corridors(params: &ParameterServer) -> Vec<LaneCorridorConfig> {
    let behavior = || Box::new(BehaviorIntersectionRuleBased::new(params));
    vec![
        LaneCorridorConfig::new(point(-20.0, -2.0), point(20.0, -2.0), behavior()).with_s_range(0.0, 25.0),
        LaneCorridorConfig::new(point(20.0, 2.0), point(-20.0, 2.0), behavior()).with_s_range(5.0, 25.0),
        LaneCorridorConfig::new(point(2.0, -20.0), point(-20.0, 2.0), behavior())
            .with_s_range(5.0, 45.0)
            .with_controlled_ids(true),
    ]
}

/// Runs the intersection scenario and returns the runtime for inspection.
///
/// Each run resets to the next scenario and takes up to `num_steps` steps,
/// sleeping `step_time / real_time_factor` on `clock` after each one. A run
/// ends early once every agent has left the map.
pub fn run_intersection<V: Viewer, C: SimClock>(
    options: &IntersectionOptions,
    viewer: V,
    clock: &C,
) -> Result<Runtime<V>, SimError> {
    let params = intersection_params()?;
    let corridors = intersection_lane_corridors(&params);
    let scenarios = ConfigWithEase::new(options.num_scenarios, &options.map_file, options.random_seed, &corridors)?;

    if let Some(rtf) = options.real_time_factor {
        params.set("simulation::real_time_factor", rtf)?;
    }
    let (step_time, real_time_factor) = simulation_timing(&params);
    let pacing = pacing_interval(step_time, real_time_factor)?;

    let mut runtime = Runtime::builder(viewer)
        .step_time(step_time)
        .scenario_generator(scenarios)
        .render(true)
        .build()?;

    run_paced(&mut runtime, options.num_runs, options.num_steps, pacing, clock)?;
    Ok(runtime)
}

/// Resets `runtime` once per run and steps it up to `num_steps` times,
/// sleeping `pacing` after every step. A run stops after the step that
/// reports [`RuntimeState::Finished`].
pub(crate) fn run_paced<V: Viewer, C: SimClock>(
    runtime: &mut Runtime<V>,
    num_runs: usize,
    num_steps: usize,
    pacing: Duration,
    clock: &C,
) -> Result<(), SimError> {
    for run in 0..num_runs {
        runtime.reset()?;
        info!("Run {}: scenario {}", run, runtime.scenario_idx());
        for step in 0..num_steps {
            let state = runtime.step()?;
            clock.sleep(pacing);
            if state == RuntimeState::Finished {
                info!("Run {}: all agents left the map after {} steps", run, step + 1);
                break;
            }
        }
    }
    Ok(())
}
