//! Error types for scenario generation, the runtime and viewers.

use lanesim_core::{CoreError, MapError, ParamsError};
use lanesim_env::EnvError;
use thiserror::Error;

/// Errors from drawing frames or encoding video.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("Render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Video encoder failed: {0}")]
    Encoder(String),

    #[error("Stepping intermediate world failed: {0}")]
    Step(#[from] CoreError),
}

impl ViewerError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }
}

/// Errors from scenario generation and the runtime.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Simulation error: {0}")]
    Core(#[from] CoreError),

    #[error("Map error: {0}")]
    Map(#[from] MapError),

    #[error("Parameter error: {0}")]
    Params(#[from] ParamsError),

    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    #[error("Viewer error: {0}")]
    Viewer(#[from] ViewerError),

    #[error("Invalid scenario configuration: {0}")]
    Config(String),

    #[error("Runtime has no scenario generator")]
    MissingGenerator,

    #[error("Runtime is not running; call reset() first")]
    NotRunning,
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
