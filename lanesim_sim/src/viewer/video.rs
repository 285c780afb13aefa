use super::{FrameSource, Viewer};
use crate::error::ViewerError;
use lanesim_core::{AgentId, World};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// printf-style pattern of the frame files inside the frame directory.
pub const FRAME_PATTERN: &str = "frame_%05d.png";

/// Turns a directory of numbered frames into a video file.
pub trait VideoEncoder {
    fn encode(&self, frame_pattern: &Path, framerate: f64, output: &Path) -> Result<(), ViewerError>;
}

/// Encodes with the `ffmpeg` command line tool.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode(&self, frame_pattern: &Path, framerate: f64, output: &Path) -> Result<(), ViewerError> {
        let status = Command::new(&self.program)
            .arg("-y")
            .arg("-framerate")
            .arg(format!("{}", framerate))
            .arg("-i")
            .arg(frame_pattern)
            .args(["-pix_fmt", "yuv420p"])
            .arg(output)
            .status()?;
        if !status.success() {
            return Err(ViewerError::encoder(format!("{} exited with {}", self.program.display(), status)));
        }
        Ok(())
    }
}

/// Wraps a frame-producing viewer and dumps every drawn world as a
/// numbered PNG, to be encoded into a video with [`export_video`].
///
/// With intermediate steps, each `draw_world` renders a copy of the world
/// that many times, stepping the copy by `world_step_time / steps` between
/// frames.
///
/// The frame directory is temporary: it is removed when the renderer is
/// dropped unless `export_video` was asked to keep it.
///
/// [`export_video`]: VideoRenderer::export_video
pub struct VideoRenderer<V, E = FfmpegEncoder> {
    renderer: V,
    encoder: E,
    world_step_time: f64,
    render_intermediate_steps: Option<usize>,
    frame_dir: PathBuf,
    /// Owns `frame_dir` until the frames are kept or removed
    frame_dir_guard: Option<TempDir>,
    frame_count: usize,
}

impl<V: FrameSource> VideoRenderer<V, FfmpegEncoder> {
    pub fn new(renderer: V, world_step_time: f64) -> Result<Self, ViewerError> {
        if !(world_step_time.is_finite() && world_step_time > 0.0) {
            return Err(ViewerError::render(format!(
                "world_step_time must be positive, got {}",
                world_step_time
            )));
        }
        let guard = tempfile::Builder::new().prefix("lanesim_frames_").tempdir()?;
        let frame_dir = guard.path().to_path_buf();
        debug!("Writing frames to {}", frame_dir.display());
        Ok(Self {
            renderer,
            encoder: FfmpegEncoder::new(),
            world_step_time,
            render_intermediate_steps: None,
            frame_dir,
            frame_dir_guard: Some(guard),
            frame_count: 0,
        })
    }
}

impl<V: FrameSource, E: VideoEncoder> VideoRenderer<V, E> {
    pub fn with_encoder<E2: VideoEncoder>(self, encoder: E2) -> VideoRenderer<V, E2> {
        VideoRenderer {
            renderer: self.renderer,
            encoder,
            world_step_time: self.world_step_time,
            render_intermediate_steps: self.render_intermediate_steps,
            frame_dir: self.frame_dir,
            frame_dir_guard: self.frame_dir_guard,
            frame_count: self.frame_count,
        }
    }

    /// Render `steps` frames per drawn world; 0 or 1 disables substepping.
    pub fn with_intermediate_steps(mut self, steps: usize) -> Self {
        self.render_intermediate_steps = (steps > 1).then_some(steps);
        self
    }

    pub fn viewer(&self) -> &V {
        &self.renderer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.renderer
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn frame_dir(&self) -> &Path {
        &self.frame_dir
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Frames per second of the exported video.
    pub fn framerate(&self) -> f64 {
        self.render_intermediate_steps.unwrap_or(1) as f64 / self.world_step_time
    }

    fn dump_frame(&mut self) -> Result<(), ViewerError> {
        let path = self.frame_dir.join(format!("frame_{:05}.png", self.frame_count));
        self.renderer.save_frame(&path)?;
        self.frame_count += 1;
        Ok(())
    }

    /// Encodes all frames into `<filename>.mp4` and returns the output path.
    ///
    /// With `remove_image_dir` the frames are deleted after encoding;
    /// otherwise they outlive the renderer. On error they stay owned by the
    /// renderer and go away with it.
    pub fn export_video(&mut self, filename: impl AsRef<Path>, remove_image_dir: bool) -> Result<PathBuf, ViewerError> {
        if self.frame_count == 0 {
            return Err(ViewerError::encoder("no frames were rendered"));
        }
        let output = filename.as_ref().with_extension("mp4");
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        self.encoder
            .encode(&self.frame_dir.join(FRAME_PATTERN), self.framerate(), &output)?;
        info!("Exported {} frames to {}", self.frame_count, output.display());

        if let Some(guard) = self.frame_dir_guard.take() {
            if remove_image_dir {
                guard.close()?;
            } else {
                let kept = guard.keep();
                info!("Keeping frames in {}", kept.display());
            }
        }
        Ok(output)
    }
}

impl<V: FrameSource, E: VideoEncoder> Viewer for VideoRenderer<V, E> {
    fn draw_world(&mut self, world: &World, eval_agent_ids: &[AgentId], scenario_idx: usize) -> Result<(), ViewerError> {
        match self.render_intermediate_steps {
            None => {
                self.renderer.draw_world(world, eval_agent_ids, scenario_idx)?;
                self.dump_frame()
            }
            Some(steps) => {
                let mut world = world.clone();
                let dt = self.world_step_time / steps as f64;
                for _ in 0..steps {
                    self.renderer.draw_world(&world, eval_agent_ids, scenario_idx)?;
                    self.dump_frame()?;
                    self.renderer.clear();
                    world.step(dt)?;
                }
                Ok(())
            }
        }
    }

    fn clear(&mut self) {
        self.renderer.clear();
    }
}
