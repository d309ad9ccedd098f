//! World error types.

use modgrid_types::{Direction, LatticeCell, ModuleId};
use thiserror::Error;

/// World construction and module placement errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    #[error("lattice dimensions must be non-zero")]
    ZeroDimension,

    #[error("cell {0} is outside the lattice")]
    CellOutOfBounds(LatticeCell),

    #[error("cell {0} is already occupied")]
    CellOccupied(LatticeCell),
}

/// A send could not be scheduled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The named port has no connected neighbor.
    #[error("{module} has no neighbor on port {port}")]
    PortNotConnected { module: ModuleId, port: Direction },
}
