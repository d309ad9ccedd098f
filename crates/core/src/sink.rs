//! The kernel boundary trait.

use crate::Event;
use modgrid_types::SimTime;

/// An event paired with its firing time, ready for queue insertion.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub fire_at: SimTime,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn new(fire_at: SimTime, event: Event) -> Self {
        ScheduledEvent { fire_at, event }
    }
}

/// Receiver of applied events: the world side of the kernel boundary.
///
/// The scheduler pops the globally earliest event, sets its firing time as
/// the new current date, and hands it to `apply`. Implementations must be:
///
/// - **Synchronous**: `apply` never blocks; all effects (including every
///   follow-up event) are complete when it returns
/// - **Deterministic**: same state + event = same mutations and follow-ups;
///   any randomness must come from a seeded generator owned by the sink
///
/// Follow-up events may fire at `now` (they sort after the current event by
/// sequence number) or later, never earlier — an earlier firing time is a
/// causality violation the scheduler reports as a fault.
pub trait EventSink: Send {
    fn apply(&mut self, now: SimTime, event: Event) -> Vec<ScheduledEvent>;
}
