//! Lattice occupancy.

use crate::error::WorldError;
use modgrid_types::{GridDims, LatticeCell, ModuleId};
use std::collections::HashMap;

/// The discrete lattice: bounds plus cell occupancy.
///
/// The occupancy map is the single source of truth for which cell a module
/// sits on; port tables are derived from it when modules attach.
#[derive(Debug)]
pub struct Lattice {
    dims: GridDims,
    occupancy: HashMap<LatticeCell, ModuleId>,
}

impl Lattice {
    pub fn new(dims: GridDims) -> Result<Self, WorldError> {
        if dims.capacity() == 0 {
            return Err(WorldError::ZeroDimension);
        }
        Ok(Lattice {
            dims,
            occupancy: HashMap::new(),
        })
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn contains(&self, cell: LatticeCell) -> bool {
        self.dims.contains(cell)
    }

    pub fn occupant(&self, cell: LatticeCell) -> Option<ModuleId> {
        self.occupancy.get(&cell).copied()
    }

    /// In bounds and unoccupied.
    pub fn is_free(&self, cell: LatticeCell) -> bool {
        self.contains(cell) && !self.occupancy.contains_key(&cell)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupancy.len()
    }

    pub(crate) fn place(&mut self, cell: LatticeCell, module: ModuleId) {
        self.occupancy.insert(cell, module);
    }

    pub(crate) fn clear(&mut self, cell: LatticeCell) {
        self.occupancy.remove(&cell);
    }
}
