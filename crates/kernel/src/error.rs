//! Kernel error types.
//!
//! Configuration and causality errors are fatal and reported to the
//! operator. An empty queue under a bounded run length is normal
//! termination, not an error. Everything else is returned to the calling
//! driver; the apply-loop itself never panics mid-batch.

use crate::scheduler::SchedulerState;
use modgrid_types::SimTime;
use thiserror::Error;

/// Malformed or missing scheduling parameters. Fatal: aborts startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A maximum date was set for an unbounded run.
    #[error("maximum date is only meaningful for a bounded run length")]
    MaximumDateUnbounded,

    /// The keyframe interval must be a positive duration.
    #[error("keyframe interval must be non-zero")]
    ZeroKeyframeInterval,

    /// The scheduler worker thread could not be spawned.
    #[error("failed to spawn scheduler worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Errors returned to the external driver.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` was called on a scheduler that is already running.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// The requested transition is illegal in the current state.
    /// No state change occurs.
    #[error("cannot {op} a scheduler in state {state:?}")]
    InvalidTransition {
        state: SchedulerState,
        op: &'static str,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Popping from an empty queue.
///
/// Under a bounded run length the scheduler recovers locally by
/// transitioning to `Ended`; this is never surfaced as a crash.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event queue is empty")]
pub struct EmptyQueue;

/// An event was about to be applied with a firing time earlier than the
/// current date.
///
/// This indicates a bug in an event producer. It is reported and ends the
/// run; silently correcting it would hide a reproducibility bug.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event fires at {event_time} but the clock is already at {current_date}")]
pub struct CausalityViolation {
    pub event_time: SimTime,
    pub current_date: SimTime,
}
