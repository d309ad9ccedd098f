//! Deterministic discrete-event scheduler.
//!
//! This crate provides the simulation kernel: a time-ordered event engine
//! that interleaves module control-program reactions, motion completions,
//! and message deliveries in a causally consistent total order. Given the
//! same seed and configuration, it produces identical event traces every
//! run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Scheduler                          │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EventQueue (BTreeMap<EventKey, Event>)         │ │
//! │  │     Ordered by: (time, insertion sequence)         │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ pop minimum                 │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     EventSink::apply (world / module code)         │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │ follow-up events            │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     insert back into the queue                     │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The apply-loop runs on a dedicated worker thread. An external driver
//! controls it through [`Scheduler`]'s handle methods (start, pause, resume,
//! request_stop), which communicate with the worker only through shared
//! state: a mutex-protected inner block, a condition variable used as a
//! single-slot notification, and an atomic terminate flag observed at
//! iteration boundaries.
//!
//! Two pacing modes drive the same state machine: [`PacingMode::RunAhead`]
//! applies events as fast as possible, [`PacingMode::RealTimePaced`] holds
//! each event until wall-clock time (minus time spent paused) reaches its
//! firing time. Pacing changes when events apply in wall-clock terms, never
//! their relative order.

mod config;
mod error;
mod event_queue;
mod observer;
mod scheduler;
mod stats;

pub use config::{PacingMode, RunLength, SchedulerConfig};
pub use error::{CausalityViolation, ConfigurationError, EmptyQueue, SchedulerError};
pub use event_queue::{EventKey, EventQueue};
pub use observer::{NullObserver, SimObserver};
pub use scheduler::{Scheduler, SchedulerControl, SchedulerState};
pub use stats::SchedulerStats;
