//! Event queue with deterministic ordering.

use crate::error::EmptyQueue;
use modgrid_core::Event;
use modgrid_types::SimTime;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Firing time (earlier first)
/// 2. Insertion sequence number (FIFO for the same time)
///
/// The sequence number is assigned by the queue at insertion and doubles as
/// the event's identity. Same-timestamp events therefore apply in creation
/// order, which downstream round-based protocols rely on for reproducible
/// message interleaving.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    /// When this event fires.
    pub time: SimTime,
    /// Insertion sequence number, the deterministic tie-breaker.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Order by time first
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Then by sequence (FIFO)
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered pending-event store.
///
/// Insertion is O(log n) regardless of how many entries share a timestamp;
/// `len` is O(1). No operation reorders already-queued events relative to
/// each other.
#[derive(Debug, Default)]
pub struct EventQueue {
    entries: BTreeMap<EventKey, Event>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    /// Insert an event, assigning it the next sequence number.
    pub fn insert(&mut self, fire_at: SimTime, event: Event) -> EventKey {
        self.next_sequence += 1;
        let key = EventKey {
            time: fire_at,
            sequence: self.next_sequence,
        };
        self.entries.insert(key, event);
        key
    }

    /// The earliest pending event, without removing it.
    pub fn peek_min(&self) -> Option<(&EventKey, &Event)> {
        self.entries.first_key_value()
    }

    /// Remove and return the earliest pending event.
    pub fn pop_min(&mut self) -> Result<(EventKey, Event), EmptyQueue> {
        self.entries.pop_first().ok_or(EmptyQueue)
    }

    /// Total sequence numbers handed out so far.
    pub fn sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgrid_types::ModuleId;

    fn step(module: u32) -> Event {
        Event::ControlStep {
            module: ModuleId(module),
        }
    }

    #[test]
    fn test_key_ordering_by_time_then_sequence() {
        let earlier = EventKey {
            time: SimTime::from_micros(1),
            sequence: 9,
        };
        let later = EventKey {
            time: SimTime::from_micros(2),
            sequence: 1,
        };
        assert!(earlier < later);

        let first = EventKey {
            time: SimTime::from_micros(1),
            sequence: 1,
        };
        let second = EventKey {
            time: SimTime::from_micros(1),
            sequence: 2,
        };
        assert!(first < second);
    }

    #[test]
    fn test_pop_order_is_time_then_insertion() {
        // Insert at times {10, 10, 5}: sequences {1, 2, 3}.
        let mut queue = EventQueue::new();
        queue.insert(SimTime::from_micros(10), step(0));
        queue.insert(SimTime::from_micros(10), step(1));
        queue.insert(SimTime::from_micros(5), step(2));

        // Pop order must be (5, #3), (10, #1), (10, #2).
        let (key, _) = queue.pop_min().unwrap();
        assert_eq!((key.time.as_micros(), key.sequence), (5, 3));
        let (key, _) = queue.pop_min().unwrap();
        assert_eq!((key.time.as_micros(), key.sequence), (10, 1));
        let (key, _) = queue.pop_min().unwrap();
        assert_eq!((key.time.as_micros(), key.sequence), (10, 2));

        assert!(queue.pop_min().is_err());
    }

    #[test]
    fn test_same_timestamp_fifo_is_stable() {
        let mut queue = EventQueue::new();
        for module in 0..100 {
            queue.insert(SimTime::from_micros(42), step(module));
        }
        for expected in 0..100u32 {
            let (_, event) = queue.pop_min().unwrap();
            assert_eq!(event.target(), ModuleId(expected));
        }
    }

    #[test]
    fn test_len_tracks_inserts_and_pops() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());
        queue.insert(SimTime::from_micros(1), step(0));
        queue.insert(SimTime::from_micros(2), step(1));
        assert_eq!(queue.len(), 2);
        queue.pop_min().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.sequence(), 2);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut queue = EventQueue::new();
        queue.insert(SimTime::from_micros(7), step(0));
        assert_eq!(queue.peek_min().unwrap().0.time, SimTime::from_micros(7));
        assert_eq!(queue.len(), 1);
    }
}
