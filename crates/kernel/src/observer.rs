//! Passive observation of the apply-loop.
//!
//! Statistics collectors and replay recorders implement [`SimObserver`] and
//! are notified at well-defined points: before each batch of consecutive
//! event applications, whenever the clock crosses a keyframe boundary, and
//! once at termination. Observers run on the scheduler's worker thread and
//! must not block; they see every hook strictly between event applications,
//! never mid-apply.

use modgrid_types::SimTime;

/// Observer interface for statistics collection and replay recording.
///
/// All methods have default no-op implementations so observers only need to
/// override the hooks they care about.
#[allow(unused_variables)]
pub trait SimObserver: Send {
    /// Called before the scheduler starts a batch of consecutive event
    /// applications (after idling, pausing, or at the start of the run).
    fn on_before_event_batch(&mut self, current_date: SimTime) {}

    /// Called when the clock crosses a keyframe boundary, and once at date
    /// zero when the run starts.
    fn on_keyframe_boundary(&mut self, current_date: SimTime) {}

    /// Called exactly once when the run ends, whatever the reason.
    fn on_terminate(&mut self, final_date: SimTime, events_applied: u64, queue_size_at_end: usize) {
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SimObserver for NullObserver {}
