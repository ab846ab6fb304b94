//! Core simulation engine for Antix: robots foraging for pucks on a torus.
//!
//! A [`World`] owns every robot, puck and home, indexes them in a
//! [`CellGrid`](antix_index::CellGrid), and advances them one tick at a time:
//! sense, decide (via a pluggable [`Controller`]), move, re-index.

pub mod config;
pub mod controller;
pub mod entity;
pub mod sensor;
pub mod world;

use antix_index::IndexError;
use thiserror::Error;

pub use antix_index::{Torus, angle_normalize, dtor, rtod};
pub use config::{AntixConfig, Scheduling};
pub use controller::{Command, ControlInput, Controller, ControllerRegistry, Grip};
pub use entity::{
    AgentId, AgentMap, Color, Home, HomeId, Pose, Puck, PuckId, PuckState, Robot, Speed,
};
pub use sensor::{SeePuck, SeeRobot, Sensor};
pub use world::{Tick, TickSummary, World, WorldTotals};

/// Errors that can occur when constructing or populating a world.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("no controller registered under key {0}")]
    UnknownController(u64),
    #[error("robot assigned to a home that does not exist")]
    UnknownHome,
}

/// Structural inconsistencies between entities and the cell grid.
///
/// These indicate a bug in the engine, never a recoverable condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantError {
    #[error("robot {agent:?} stores cell {stored} but stands in cell {expected}")]
    AgentCellStale {
        agent: AgentId,
        stored: usize,
        expected: usize,
    },
    #[error("robot {agent:?} is not registered in cell {cell}")]
    AgentNotInCell { agent: AgentId, cell: usize },
    #[error("grid registers {registered} robots but the world has {robots}")]
    AgentCountMismatch { registered: usize, robots: usize },
    #[error("free puck {puck:?} is not registered in cell {cell}")]
    PuckNotInCell { puck: PuckId, cell: usize },
    #[error("grid registers {registered} free pucks but {free} pucks are free")]
    PuckCountMismatch { registered: usize, free: usize },
    #[error("robot {agent:?} and puck {puck:?} disagree about who holds what")]
    HolderMismatch { agent: AgentId, puck: PuckId },
}
