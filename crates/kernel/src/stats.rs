//! Run statistics.

use modgrid_core::EventKind;

/// Statistics collected during a run.
///
/// Queryable at any time through the scheduler handle, including after the
/// run has ended.
#[derive(Debug, Default, Clone)]
pub struct SchedulerStats {
    /// Total events applied.
    pub events_applied: u64,
    /// Events applied, by kind.
    pub events_by_kind: [u64; EventKind::COUNT],
    /// Total events inserted into the queue (including never-applied ones).
    pub events_scheduled: u64,
    /// Largest queue length observed.
    pub peak_queue_len: usize,
    /// Keyframe boundaries emitted to the observer.
    pub keyframes_emitted: u64,
}

impl SchedulerStats {
    /// Events applied of one kind.
    pub fn applied_of(&self, kind: EventKind) -> u64 {
        self.events_by_kind[kind as usize]
    }

    /// Events that were scheduled but never applied.
    pub fn events_unapplied(&self) -> u64 {
        self.events_scheduled.saturating_sub(self.events_applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_kind_accounting() {
        let mut stats = SchedulerStats::default();
        stats.events_by_kind[EventKind::MessageArrival as usize] = 3;
        assert_eq!(stats.applied_of(EventKind::MessageArrival), 3);
        assert_eq!(stats.applied_of(EventKind::MotionEnd), 0);
    }

    #[test]
    fn test_unapplied_count() {
        let stats = SchedulerStats {
            events_scheduled: 10,
            events_applied: 7,
            ..Default::default()
        };
        assert_eq!(stats.events_unapplied(), 3);
    }
}
