//! Core event model for the modgrid simulation kernel.
//!
//! This crate provides the types that cross the kernel boundary:
//!
//! - [`Event`]: all event kinds the kernel schedules and applies
//! - [`Message`]: logical in-process messages exchanged between modules
//! - [`EventSink`]: the trait the world implements to receive events
//!
//! # Architecture
//!
//! The kernel is built on a pull model:
//!
//! ```text
//! Scheduler pops (time, sequence)-minimum Event
//!     → EventSink::apply() mutates module/world state
//!         → returns follow-up ScheduledEvents
//!             → Scheduler inserts them into the queue
//! ```
//!
//! Applying an event is:
//! - **Synchronous**: no blocking inside `apply`
//! - **Deterministic**: same state + event = same follow-ups
//! - **Exclusive**: never concurrent with another apply
//!
//! The event queue and simulation clock are owned by the scheduler; the sink
//! (and anything behind it) can only contribute new events, never reorder or
//! inspect queued ones.

mod event;
mod message;
mod sink;

pub use event::{Event, EventKind};
pub use message::{Message, MessageKind};
pub use sink::{EventSink, ScheduledEvent};
