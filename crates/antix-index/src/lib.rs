//! Spatial indexing abstractions for Antix neighborhood queries.
//!
//! Two pieces live here: [`Torus`], the wraparound geometry every position and
//! heading is normalized against, and [`CellGrid`], the uniform grid that keeps
//! sensing proportional to local density instead of population size.

mod grid;
mod torus;

use thiserror::Error;

pub use grid::{Cell, CellGrid, MAX_CELLS, NeighborCells};
pub use torus::{Torus, angle_normalize, dtor, rtod};

/// Errors emitted by geometry and index construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., non-positive world size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
