//! Viewers draw a world per step; the video renderer turns drawn frames
//! into a video file.

mod bitmap;
mod video;

pub use bitmap::BitmapViewer;
pub use video::{FfmpegEncoder, VideoEncoder, VideoRenderer};

use crate::error::ViewerError;
use lanesim_core::{AgentId, World};
use std::path::Path;
use tracing::info;

/// Something that can draw a world.
pub trait Viewer {
    /// Draws `world`, highlighting the agents in `eval_agent_ids`.
    fn draw_world(&mut self, world: &World, eval_agent_ids: &[AgentId], scenario_idx: usize) -> Result<(), ViewerError>;

    /// Discards what has been drawn so far.
    fn clear(&mut self);
}

/// A viewer whose last drawn frame can be written to an image file.
pub trait FrameSource: Viewer {
    fn save_frame(&self, path: &Path) -> Result<(), ViewerError>;
}

/// Headless viewer that reports each drawn world through `tracing`.
#[derive(Debug, Default)]
pub struct LogViewer {
    frames_drawn: usize,
}

impl LogViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_drawn(&self) -> usize {
        self.frames_drawn
    }
}

impl Viewer for LogViewer {
    fn draw_world(&mut self, world: &World, eval_agent_ids: &[AgentId], scenario_idx: usize) -> Result<(), ViewerError> {
        self.frames_drawn += 1;
        let collisions = world.collisions();
        info!(
            "scenario {} t={:.2}s: {} agents, eval {:?}, collisions {:?}",
            scenario_idx,
            world.time(),
            world.agents().len(),
            eval_agent_ids,
            collisions
        );
        for id in eval_agent_ids {
            if world.goal_reached(*id) {
                info!("Agent {} reached its goal", id);
            }
        }
        Ok(())
    }

    fn clear(&mut self) {}
}
