//! Identifier newtypes.

use std::fmt;

/// Stable identifier of a module.
///
/// Also serves as the index into the world's module table; relations between
/// modules (neighbors, parents in distributed protocols) are expressed as
/// `ModuleId`s resolved through that table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u32);

impl ModuleId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module-{}", self.0)
    }
}

/// Orientation code of a module on the lattice.
///
/// Carried by motion events; the kernel treats it as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Orientation(pub u8);
