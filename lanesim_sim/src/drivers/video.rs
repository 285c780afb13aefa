//! Renders a batch of configurable scenarios into one video.

use super::simulation_timing;
use crate::error::SimError;
use crate::generation::{ConfigurableScenarioGeneration, ScenarioGeneration};
use crate::viewer::{FrameSource, VideoEncoder, VideoRenderer, Viewer};
use lanesim_core::ParameterServer;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct VideoOptions {
    /// JSON parameter file holding the scenario generation config
    pub param_file: PathBuf,
    pub num_scenarios: usize,
    pub random_seed: u64,
    pub scenarios_to_show: usize,
    pub steps_per_scenario: usize,
    /// Output path; the `.mp4` extension is added
    pub output: PathBuf,
    pub remove_image_dir: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            param_file: PathBuf::from("demos/params/intersection_configurable.json"),
            num_scenarios: 20,
            random_seed: 0,
            scenarios_to_show: 10,
            steps_per_scenario: 20,
            output: PathBuf::from("demos/scenarios/test_video_step"),
            remove_image_dir: true,
        }
    }
}

/// Draws `steps_per_scenario` steps of each of `scenarios_to_show`
/// scenarios and exports them as a video. The generator's first scenario
/// is skipped.
///
/// Returns the renderer (holding the viewer) and the exported video path.
pub fn run_video_rendering<V: FrameSource, E: VideoEncoder>(
    options: &VideoOptions,
    viewer: V,
    encoder: E,
) -> Result<(VideoRenderer<V, E>, PathBuf), SimError> {
    let params = ParameterServer::load(&options.param_file)?;
    let mut generation = ConfigurableScenarioGeneration::new(options.num_scenarios, options.random_seed, &params)?;

    let (step_time, real_time_factor) = simulation_timing(&params);
    info!("step_time={}s real_time_factor={}", step_time, real_time_factor);
    let _ = generation.get_next_scenario();

    let mut renderer = VideoRenderer::new(viewer, step_time / 3.0)?.with_encoder(encoder);
    for _ in 0..options.scenarios_to_show {
        let (scenario, idx) = generation.get_next_scenario();
        let mut world = scenario.get_world_state();
        for _ in 0..options.steps_per_scenario {
            renderer.draw_world(&world, scenario.eval_agent_ids(), idx)?;
            world.step(step_time)?;
            renderer.viewer_mut().clear();
        }
    }

    let output = renderer.export_video(&options.output, options.remove_image_dir)?;
    Ok((renderer, output))
}
