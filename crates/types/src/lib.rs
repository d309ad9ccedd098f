//! Foundation types for the modgrid lattice simulator.
//!
//! This crate provides the foundational types used throughout the simulator:
//!
//! - **Time**: [`SimTime`], the microsecond-granularity simulation clock
//! - **Identifiers**: [`ModuleId`], [`Orientation`]
//! - **Geometry**: [`LatticeCell`], [`Direction`], [`GridDims`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer. Relations
//! between modules are always expressed through [`ModuleId`] plus a lookup
//! table owned by the world, never through references.

mod identifiers;
mod lattice;
mod time;

pub use identifiers::{ModuleId, Orientation};
pub use lattice::{Direction, GridDims, LatticeCell};
pub use time::SimTime;
