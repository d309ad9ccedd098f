//! Shared fixtures for scheduler tests.
#![allow(dead_code)]

use modgrid_core::{Event, EventKind, EventSink, Message, MessageKind, ScheduledEvent};
use modgrid_kernel::SimObserver;
use modgrid_types::{Direction, ModuleId, SimTime};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const PING: MessageKind = MessageKind(7);

/// One applied event, as seen by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub time: u64,
    pub kind: EventKind,
    pub target: ModuleId,
}

impl TraceEntry {
    pub fn of(now: SimTime, event: &Event) -> Self {
        TraceEntry {
            time: now.as_micros(),
            kind: event.kind(),
            target: event.target(),
        }
    }
}

/// Message body for the relay ring.
pub struct Ttl(pub u32);

/// A ring of virtual modules relaying a ping with seeded jitter.
///
/// Each control step launches a ping that hops around the ring until its
/// TTL runs out; per-hop latency carries jitter from the seeded RNG, so the
/// applied-event order depends on the seed and nothing else.
pub struct RelaySink {
    ring_size: u32,
    rng: ChaCha8Rng,
    pub trace: Vec<TraceEntry>,
}

impl RelaySink {
    pub fn new(ring_size: u32, seed: u64) -> Self {
        RelaySink {
            ring_size,
            rng: ChaCha8Rng::seed_from_u64(seed),
            trace: Vec::new(),
        }
    }

    fn hop(&mut self, now: SimTime, to: ModuleId, ttl: u32) -> ScheduledEvent {
        let jitter = Duration::from_micros(self.rng.gen_range(0..200));
        ScheduledEvent::new(
            now + Duration::from_micros(500) + jitter,
            Event::MessageArrival {
                to,
                port: Direction::PlusX,
                message: Message::new(PING, Ttl(ttl)),
            },
        )
    }

    fn next_module(&self, from: ModuleId) -> ModuleId {
        ModuleId((from.0 + 1) % self.ring_size)
    }
}

impl EventSink for RelaySink {
    fn apply(&mut self, now: SimTime, event: Event) -> Vec<ScheduledEvent> {
        self.trace.push(TraceEntry::of(now, &event));
        match event {
            Event::ControlStep { module } => {
                let to = self.next_module(module);
                vec![self.hop(now, to, 8)]
            }
            Event::MessageArrival { to, message, .. } => {
                let ttl = message.body::<Ttl>().map(|t| t.0).unwrap_or(0);
                if ttl == 0 {
                    vec![]
                } else {
                    let next = self.next_module(to);
                    vec![self.hop(now, next, ttl - 1)]
                }
            }
            _ => vec![],
        }
    }
}

/// Sink that records the trace and schedules nothing.
#[derive(Default)]
pub struct CollectSink {
    pub trace: Vec<TraceEntry>,
}

impl EventSink for CollectSink {
    fn apply(&mut self, now: SimTime, event: Event) -> Vec<ScheduledEvent> {
        self.trace.push(TraceEntry::of(now, &event));
        vec![]
    }
}

/// Sink that announces each apply over a channel, then holds the apply open
/// for a fixed wall-clock duration. Used to observe in-flight behavior.
pub struct BlockingSink {
    pub entered: Sender<()>,
    pub hold: Duration,
    pub applied: u64,
}

impl EventSink for BlockingSink {
    fn apply(&mut self, _now: SimTime, _event: Event) -> Vec<ScheduledEvent> {
        self.entered.send(()).ok();
        thread::sleep(self.hold);
        self.applied += 1;
        vec![]
    }
}

/// Everything an observer saw, shared with the test body.
#[derive(Debug, Default)]
pub struct ObserverLog {
    pub batches: Vec<u64>,
    pub keyframes: Vec<u64>,
    pub terminated: Option<(u64, u64, usize)>,
}

pub struct RecordingObserver(pub Arc<Mutex<ObserverLog>>);

impl SimObserver for RecordingObserver {
    fn on_before_event_batch(&mut self, current_date: SimTime) {
        self.0.lock().unwrap().batches.push(current_date.as_micros());
    }

    fn on_keyframe_boundary(&mut self, current_date: SimTime) {
        self.0
            .lock()
            .unwrap()
            .keyframes
            .push(current_date.as_micros());
    }

    fn on_terminate(&mut self, final_date: SimTime, events_applied: u64, queue_size_at_end: usize) {
        self.0.lock().unwrap().terminated =
            Some((final_date.as_micros(), events_applied, queue_size_at_end));
    }
}

/// Poll until the condition holds, failing the test after five seconds.
pub fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}
