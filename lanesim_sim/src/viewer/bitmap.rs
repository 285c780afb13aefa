use super::{FrameSource, Viewer};
use crate::error::ViewerError;
use lanesim_core::geometry::{BoundingBox, Polygon2d};
use lanesim_core::{AgentId, World};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;
use tracing::debug;

const LANE_FILL: RGBColor = RGBColor(215, 215, 215);
const LANE_BORDER: RGBColor = RGBColor(120, 120, 120);
const AGENT_FILL: RGBColor = RGBColor(40, 90, 200);
const EVAL_AGENT_FILL: RGBColor = RGBColor(220, 60, 40);
const GOAL_FILL: RGBColor = RGBColor(60, 180, 75);

/// Margin (m) around the world bounds.
const WORLD_BOUNDS_MARGIN: f64 = 5.0;

type Ring = Vec<(f64, f64)>;

fn ring(polygon: &Polygon2d) -> Ring {
    polygon.exterior().iter().map(|c| (c.x, c.y)).collect()
}

fn render_error(e: impl Display) -> ViewerError {
    ViewerError::render(e.to_string())
}

/// Plot-ready geometry of one world.
#[derive(Debug, Clone, Default)]
struct Scene {
    x_range: (f64, f64),
    y_range: (f64, f64),
    lanes: Vec<Ring>,
    goals: Vec<Ring>,
    agents: Vec<(Ring, bool)>,
}

impl Scene {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), ViewerError> {
        root.fill(&WHITE).map_err(render_error)?;
        if self.x_range.1 <= self.x_range.0 || self.y_range.1 <= self.y_range.0 {
            return Ok(());
        }

        let mut chart = ChartBuilder::on(root)
            .margin(5)
            .build_cartesian_2d(self.x_range.0..self.x_range.1, self.y_range.0..self.y_range.1)
            .map_err(render_error)?;

        chart
            .draw_series(self.lanes.iter().map(|r| Polygon::new(r.clone(), LANE_FILL.filled())))
            .map_err(render_error)?;
        chart
            .draw_series(self.lanes.iter().map(|r| {
                let mut closed = r.clone();
                if let Some(first) = r.first() {
                    closed.push(*first);
                }
                PathElement::new(closed, LANE_BORDER.stroke_width(1))
            }))
            .map_err(render_error)?;
        chart
            .draw_series(self.goals.iter().map(|r| Polygon::new(r.clone(), GOAL_FILL.mix(0.4).filled())))
            .map_err(render_error)?;
        chart
            .draw_series(self.agents.iter().map(|(r, eval)| {
                let color = if *eval { EVAL_AGENT_FILL } else { AGENT_FILL };
                Polygon::new(r.clone(), color.filled())
            }))
            .map_err(render_error)?;
        Ok(())
    }
}

/// Renders worlds into an in-memory RGB frame with `plotters`.
#[derive(Debug, Clone)]
pub struct BitmapViewer {
    width: u32,
    height: u32,
    use_world_bounds: bool,
    x_range: (f64, f64),
    y_range: (f64, f64),
    scene: Scene,
    buffer: Vec<u8>,
}

impl BitmapViewer {
    /// A `width` x `height` viewer showing x and y in [-40, 40].
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            use_world_bounds: false,
            x_range: (-40.0, 40.0),
            y_range: (-40.0, 40.0),
            scene: Scene::default(),
            buffer: vec![255; (width as usize) * (height as usize) * 3],
        }
    }

    /// Fit every frame to the map and agents instead of the fixed ranges.
    pub fn use_world_bounds(mut self, use_world_bounds: bool) -> Self {
        self.use_world_bounds = use_world_bounds;
        self
    }

    pub fn with_range(mut self, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        self.x_range = x_range;
        self.y_range = y_range;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGB pixels of the last drawn frame, row-major.
    pub fn frame_buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Expands `bb` so its aspect ratio matches the frame.
    fn fit_to_frame(&self, bb: BoundingBox) -> ((f64, f64), (f64, f64)) {
        let bb = bb.expand(WORLD_BOUNDS_MARGIN);
        let (cx, cy) = ((bb.min.x + bb.max.x) / 2.0, (bb.min.y + bb.max.y) / 2.0);
        let aspect = self.width as f64 / self.height.max(1) as f64;
        let half_w = (bb.width() / 2.0).max(bb.height() / 2.0 * aspect);
        let half_h = half_w / aspect;
        ((cx - half_w, cx + half_w), (cy - half_h, cy + half_h))
    }

    fn scene_of(&self, world: &World, eval_agent_ids: &[AgentId]) -> Scene {
        let (x_range, y_range) = if self.use_world_bounds {
            self.fit_to_frame(world.bounding_box())
        } else {
            (self.x_range, self.y_range)
        };

        let lanes = world
            .map()
            .lanes()
            .map(|lane| {
                let half = lane.width / 2.0;
                ring(&Polygon2d::from_boundaries(
                    &lane.center_line.offset(half),
                    &lane.center_line.offset(-half),
                ))
            })
            .collect();

        let mut goals = Vec::new();
        let mut agents = Vec::new();
        for agent in world.agents().values() {
            let eval = eval_agent_ids.contains(&agent.id);
            if let Some(goal) = agent.goal.as_ref().filter(|_| eval) {
                goals.push(ring(goal.polygon()));
            }
            agents.push((ring(&agent.polygon()), eval));
        }

        Scene { x_range, y_range, lanes, goals, agents }
    }
}

impl Viewer for BitmapViewer {
    fn draw_world(&mut self, world: &World, eval_agent_ids: &[AgentId], scenario_idx: usize) -> Result<(), ViewerError> {
        let scene = self.scene_of(world, eval_agent_ids);
        {
            let root = BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height)).into_drawing_area();
            scene.draw(&root)?;
            root.present().map_err(render_error)?;
        }
        debug!("Drew scenario {} at t={:.2}s", scenario_idx, world.time());
        self.scene = scene;
        Ok(())
    }

    fn clear(&mut self) {
        self.scene = Scene::default();
        self.buffer.fill(255);
    }
}

impl FrameSource for BitmapViewer {
    fn save_frame(&self, path: &Path) -> Result<(), ViewerError> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        self.scene.draw(&root)?;
        root.present().map_err(render_error)?;
        Ok(())
    }
}
