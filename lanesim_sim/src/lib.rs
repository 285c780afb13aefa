//! lanesim scenario layer.
//!
//! Generates scenarios on top of the `lanesim_core` engine, runs them
//! through a [`Runtime`] and renders them with a [`Viewer`]:
//!
//! ```text
//!   ParameterServer ──▶ ScenarioGeneration ──▶ Scenario ──▶ World
//!                                                  │
//!                         Runtime (reset / step) ◀─┘
//!                              │
//!                              ▼
//!                    Viewer ─▶ VideoRenderer ─▶ VideoEncoder (ffmpeg)
//! ```
//!
//! The [`drivers`] module holds the two ready-made scenario drivers.

pub mod drivers;
pub mod error;
pub mod generation;
pub mod runtime;
pub mod scenario;
pub mod viewer;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{SimError, ViewerError};
pub use generation::{ConfigWithEase, ConfigurableScenarioGeneration, LaneCorridorConfig, ScenarioGeneration};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeState};
pub use scenario::Scenario;
pub use viewer::{BitmapViewer, FfmpegEncoder, FrameSource, LogViewer, VideoEncoder, VideoRenderer, Viewer};
