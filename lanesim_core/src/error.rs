//! Error types for the simulation engine.

use crate::behavior::BehaviorError;
use crate::execution::ExecutionError;
use crate::map::MapError;
use crate::params::ParamsError;
use crate::world::AgentId;
use thiserror::Error;

/// Errors raised while building or stepping a world.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Parameter error: {0}")]
    Params(#[from] ParamsError),

    #[error("Map error: {0}")]
    Map(#[from] MapError),

    #[error("Behavior error: {0}")]
    Behavior(#[from] BehaviorError),

    #[error("Execution error for agent {agent}: {error}")]
    Execution { agent: AgentId, error: ExecutionError },

    #[error("Agent {0} already exists in the world")]
    DuplicateAgent(AgentId),

    #[error("Agent {0} does not exist in the world")]
    UnknownAgent(AgentId),
}

impl CoreError {
    pub fn execution(agent: AgentId, error: ExecutionError) -> Self {
        Self::Execution { agent, error }
    }
}
