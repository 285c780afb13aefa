//! lanesim core: the traffic simulation engine.
//!
//! A [`World`] holds agents driving along lane corridors of a
//! [`MapInterface`]. Each step every agent's [`BehaviorModel`] plans a short
//! trajectory from an [`ObservedWorld`] snapshot, and its
//! [`ExecutionModel`] samples that trajectory at the next world time.
//!
//! Tunable values come from a [`ParameterServer`], a JSON tree addressed
//! with `::`-separated keys such as `BehaviorIDMClassic::DesiredVelocity`.

pub mod behavior;
pub mod dynamic;
pub mod error;
pub mod execution;
pub mod geometry;
pub mod map;
pub mod params;
pub mod world;

pub use behavior::{behavior_from_name, BehaviorError, BehaviorModel, BehaviorStatus};
pub use dynamic::{State, StateDefinition, Trajectory};
pub use error::CoreError;
pub use execution::{ExecutionError, ExecutionModel, ExecutionModelInterpolate, ExecutionModelKind};
pub use geometry::{BoundingBox, Line, Point2d, Polygon2d};
pub use map::{LaneCorridor, MapError, MapInterface};
pub use params::{ParameterServer, ParamsError};
pub use world::{Agent, AgentId, GoalDefinitionPolygon, ObservedWorld, World};
