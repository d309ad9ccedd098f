//! Lattice world and module runtime.
//!
//! This crate implements the world side of the kernel boundary: a discrete
//! lattice populated with modular-robot units, each running a control
//! program ([`ModuleCode`]). The world implements
//! [`EventSink`](modgrid_core::EventSink) — the scheduler pops events, the
//! world dispatches them:
//!
//! - message arrivals go to the target module's control program;
//! - motion start/end events detach a module, relocate it, and reattach it,
//!   emitting paired neighbor-change notifications for both sides of every
//!   affected link;
//! - control steps drive the control program (startup, then periodic steps).
//!
//! All randomness (delivery jitter) flows from a single `ChaCha8Rng` seeded
//! at construction, and all iteration uses fixed orders, so a run is
//! reproducible from its seed and configuration alone.

mod error;
mod lattice;
mod link;
mod module;
mod world;

pub use error::{SendError, WorldError};
pub use lattice::Lattice;
pub use link::{Endpoint, NetworkLink};
pub use module::{HandlerRegistry, MessageHandler, ModuleCode, ModuleContext, ModuleState};
pub use world::{World, WorldConfig, WorldStats};
