//! The scheduler: state machine, pacing, and driver handle.

use crate::config::{PacingMode, RunLength, SchedulerConfig};
use crate::error::{CausalityViolation, EmptyQueue, SchedulerError};
use crate::event_queue::{EventKey, EventQueue};
use crate::observer::{NullObserver, SimObserver};
use crate::stats::SchedulerStats;
use modgrid_core::{Event, EventSink};
use modgrid_types::SimTime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// How long the worker sleeps when idle in real-time mode (or waiting for
/// injected events under an unbounded length). Bounded so stop, pause, and
/// newly inserted events are noticed promptly without busy-spinning.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Lifecycle state of the scheduler.
///
/// `NotReady → NotStarted → Running ⇄ Paused → Ended`. `NotReady` is the
/// unvalidated-configuration phase before [`Scheduler::spawn`]; a spawned
/// scheduler is never observed in it. `Ended` is terminal: no further events
/// apply, but statistics remain queryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    NotReady,
    NotStarted,
    Running,
    Paused,
    Ended,
}

/// Capability interface exposed to the external driver.
///
/// The core engine ([`Scheduler`]) is one implementation; alternate backends
/// implement the same interface and are substituted at configuration time.
/// Configuration itself happens at construction, which performs the
/// `NotReady → NotStarted` transition.
pub trait SchedulerControl {
    /// `NotStarted → Running`. Fails with [`SchedulerError::AlreadyRunning`]
    /// on a running scheduler and [`SchedulerError::InvalidTransition`]
    /// otherwise.
    fn start(&self) -> Result<(), SchedulerError>;

    /// `Running → Paused`. The in-flight event application completes before
    /// the pause is honored. No-op outside `Running`.
    fn pause(&self);

    /// `Paused → Running`. No-op outside `Paused`.
    fn resume(&self);

    /// Request cooperative termination and wait for the worker to
    /// acknowledge. The flag is observed at iteration boundaries, so an
    /// in-flight apply always completes; once this returns, no further
    /// events are applied and [`SchedulerControl::current_state`] reports
    /// `Ended`.
    fn request_stop(&self);

    fn current_state(&self) -> SchedulerState;
}

/// State shared between the driver handle and the worker thread.
///
/// The condition variable is the single-slot notification for start, resume,
/// stop, and event injection. Signaling is idempotent; waiters handle
/// spurious wakeups by rechecking state.
struct Shared {
    inner: Mutex<Inner>,
    signal: Condvar,
    stop_requested: AtomicBool,
}

struct Inner {
    queue: EventQueue,
    current_date: SimTime,
    state: SchedulerState,
    stats: SchedulerStats,
    fault: Option<CausalityViolation>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("scheduler state lock poisoned")
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Inner>) -> MutexGuard<'a, Inner> {
        self.signal
            .wait(guard)
            .expect("scheduler state lock poisoned")
    }
}

/// The discrete-event scheduler.
///
/// Owns the event queue and the simulation clock, and drives the apply-loop
/// on a dedicated worker thread. Exactly one scheduler exists per simulation
/// run: constructed at configuration time via [`Scheduler::spawn`], torn
/// down by [`Scheduler::join`] (or drop, which requests a stop).
///
/// The handle communicates with the worker only through shared state; event
/// application is strictly serialized on the worker, which is what gives the
/// kernel its deterministic-ordering guarantee.
pub struct Scheduler<S: EventSink> {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<S>>,
}

impl<S: EventSink + 'static> Scheduler<S> {
    /// Validate the configuration, spawn the worker, and seed nothing.
    ///
    /// This is the `NotReady → NotStarted` transition: on success the worker
    /// thread is blocked awaiting the start signal (or already running if
    /// `auto_start` is configured). Initial events are injected with
    /// [`Scheduler::schedule_at`] before calling `start`.
    pub fn spawn(config: SchedulerConfig, sink: S) -> Result<Self, SchedulerError> {
        Self::spawn_with_observer(config, sink, Box::new(NullObserver))
    }

    /// Like [`Scheduler::spawn`], with a stats/replay observer attached.
    pub fn spawn_with_observer(
        config: SchedulerConfig,
        sink: S,
        observer: Box<dyn SimObserver>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                queue: EventQueue::new(),
                current_date: SimTime::ZERO,
                state: SchedulerState::NotStarted,
                stats: SchedulerStats::default(),
                fault: None,
            }),
            signal: Condvar::new(),
            stop_requested: AtomicBool::new(false),
        });

        let worker = Worker {
            shared: Arc::clone(&shared),
            next_keyframe: config.keyframe_interval,
            config: config.clone(),
            sink,
            observer,
            batch_open: false,
            keyframes_emitted: 0,
        };

        let handle = thread::Builder::new()
            .name("modgrid-scheduler".into())
            .spawn(move || worker.run())
            .map_err(crate::error::ConfigurationError::WorkerSpawn)?;

        let scheduler = Scheduler {
            shared,
            worker: Some(handle),
        };

        if config.auto_start {
            scheduler.start()?;
        }

        Ok(scheduler)
    }

    /// Insert an event into the queue from outside the apply-loop.
    ///
    /// Used to seed initial events before `start` and by live control
    /// interfaces while the run is in flight. An event scheduled earlier
    /// than the current date will surface as a [`CausalityViolation`] when
    /// it reaches the front of the queue.
    pub fn schedule_at(&self, fire_at: SimTime, event: Event) -> EventKey {
        let mut inner = self.shared.lock();
        let key = inner.queue.insert(fire_at, event);
        inner.stats.events_scheduled += 1;
        let len = inner.queue.len();
        inner.stats.peak_queue_len = inner.stats.peak_queue_len.max(len);
        drop(inner);
        self.shared.signal.notify_all();
        key
    }

    /// Current simulation date.
    pub fn now(&self) -> SimTime {
        self.shared.lock().current_date
    }

    /// Snapshot of the run statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.shared.lock().stats.clone()
    }

    /// Number of pending events.
    pub fn queue_len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// The causality fault that ended the run, if any.
    pub fn fault(&self) -> Option<CausalityViolation> {
        self.shared.lock().fault
    }

    /// Wait for the worker to finish and recover the sink.
    ///
    /// The run must end on its own (bounded length, maximum date, or
    /// quiescence under `auto_stop`) or via [`SchedulerControl::request_stop`]
    /// first; joining an unbounded run without stopping it blocks forever.
    pub fn join(mut self) -> S {
        let handle = self
            .worker
            .take()
            .expect("worker thread present until join");
        match handle.join() {
            Ok(sink) => sink,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl<S: EventSink + 'static> SchedulerControl for Scheduler<S> {
    fn start(&self) -> Result<(), SchedulerError> {
        let mut inner = self.shared.lock();
        match inner.state {
            SchedulerState::NotStarted => {
                inner.state = SchedulerState::Running;
                drop(inner);
                self.shared.signal.notify_all();
                info!("scheduler start");
                Ok(())
            }
            SchedulerState::Running => Err(SchedulerError::AlreadyRunning),
            state => Err(SchedulerError::InvalidTransition { state, op: "start" }),
        }
    }

    fn pause(&self) {
        let mut inner = self.shared.lock();
        if inner.state == SchedulerState::Running {
            inner.state = SchedulerState::Paused;
            drop(inner);
            self.shared.signal.notify_all();
            debug!("pause requested");
        }
    }

    fn resume(&self) {
        let mut inner = self.shared.lock();
        if inner.state == SchedulerState::Paused {
            inner.state = SchedulerState::Running;
            drop(inner);
            self.shared.signal.notify_all();
            debug!("resume requested");
        }
    }

    fn request_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Relaxed);
        self.shared.signal.notify_all();
        let mut inner = self.shared.lock();
        while inner.state != SchedulerState::Ended {
            inner = self.shared.wait(inner);
        }
    }

    fn current_state(&self) -> SchedulerState {
        self.shared.lock().state
    }
}

impl<S: EventSink> Drop for Scheduler<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.shared.stop_requested.store(true, Ordering::Relaxed);
            self.shared.signal.notify_all();
            let _ = handle.join();
        }
    }
}

/// Outcome of inspecting the front of the queue.
enum Next {
    /// Pop succeeded; the clock has advanced to the event's firing time.
    Apply(EventKey, Event),
    /// The queue is empty.
    Drained,
    /// Real-time pacing: the earliest event has not been reached by
    /// wall-clock time yet.
    NotYetDue,
    /// The earliest event fires beyond the configured maximum date.
    PastMaximumDate,
    /// The earliest event fires before the current date.
    Fault(CausalityViolation),
}

/// The apply-loop, running on the dedicated worker thread.
struct Worker<S: EventSink> {
    shared: Arc<Shared>,
    config: SchedulerConfig,
    sink: S,
    observer: Box<dyn SimObserver>,
    next_keyframe: Option<SimTime>,
    /// Whether we are inside a batch of consecutive applies. Reset whenever
    /// the loop idles, sleeps, or pauses, so the observer sees a
    /// before-batch hook at each resumption of work.
    batch_open: bool,
    keyframes_emitted: u64,
}

impl<S: EventSink> Worker<S> {
    fn run(mut self) -> S {
        if self.wait_for_start() {
            if self.config.keyframe_interval.is_some() {
                self.observer.on_keyframe_boundary(SimTime::ZERO);
                self.keyframes_emitted += 1;
            }
            match self.config.pacing {
                PacingMode::RunAhead => self.run_ahead(),
                PacingMode::RealTimePaced => self.real_time(),
            }
        } else {
            self.end_run("stop requested before start");
        }
        self.sink
    }

    /// Block until the start signal. Returns false if a stop was requested
    /// before the scheduler ever ran.
    fn wait_for_start(&self) -> bool {
        let mut inner = self.shared.lock();
        while inner.state == SchedulerState::NotStarted && !self.stop_requested() {
            inner = self.shared.wait(inner);
        }
        drop(inner);
        if self.stop_requested() {
            return false;
        }
        info!(mode = ?self.config.pacing, "scheduler running");
        true
    }

    /// Run-ahead pacing: pop and apply with no wall-clock delay.
    fn run_ahead(&mut self) {
        loop {
            if self.stop_requested() {
                return self.end_run("stop requested");
            }
            if self.wait_while_paused().is_none() {
                return self.end_run("stop requested");
            }

            let next = {
                let mut inner = self.shared.lock();
                self.next_event(&mut inner, None)
            };

            match next {
                Next::Apply(key, event) => self.apply_event(key, event),
                Next::Drained => {
                    if let Some(reason) = self.quiesce() {
                        return self.end_run(reason);
                    }
                }
                Next::PastMaximumDate => {
                    self.clamp_to_maximum_date();
                    return self.end_run("maximum date reached");
                }
                Next::Fault(violation) => return self.fail(violation),
                // Not produced without a due limit.
                Next::NotYetDue => {}
            }
        }
    }

    /// Real-time pacing: apply an event only once elapsed wall-clock time
    /// (excluding time spent paused) has reached its firing time.
    fn real_time(&mut self) {
        let wall_start = Instant::now();
        let mut paused_total = Duration::ZERO;

        loop {
            if self.stop_requested() {
                return self.end_run("stop requested");
            }
            match self.wait_while_paused() {
                None => return self.end_run("stop requested"),
                Some(paused) => paused_total += paused,
            }

            let elapsed = wall_start.elapsed().saturating_sub(paused_total);
            let due_through = SimTime::from_micros(elapsed.as_micros() as u64);

            let next = {
                let mut inner = self.shared.lock();
                self.next_event(&mut inner, Some(due_through))
            };

            match next {
                Next::Apply(key, event) => self.apply_event(key, event),
                Next::NotYetDue => {
                    self.batch_open = false;
                    self.idle_wait();
                }
                Next::Drained => {
                    if let Some(reason) = self.quiesce() {
                        return self.end_run(reason);
                    }
                }
                Next::PastMaximumDate => {
                    self.clamp_to_maximum_date();
                    return self.end_run("maximum date reached");
                }
                Next::Fault(violation) => return self.fail(violation),
            }
        }
    }

    /// Inspect the front of the queue and, when possible, pop the next
    /// event, advancing the clock to its firing time.
    fn next_event(&self, inner: &mut Inner, due_through: Option<SimTime>) -> Next {
        let Some((key, _)) = inner.queue.peek_min() else {
            return Next::Drained;
        };
        let key = *key;

        if let Some(maximum_date) = self.config.maximum_date {
            if key.time > maximum_date {
                return Next::PastMaximumDate;
            }
        }

        if key.time < inner.current_date {
            return Next::Fault(CausalityViolation {
                event_time: key.time,
                current_date: inner.current_date,
            });
        }

        if let Some(due_through) = due_through {
            if key.time > due_through {
                return Next::NotYetDue;
            }
        }

        match inner.queue.pop_min() {
            Ok((key, event)) => {
                inner.current_date = key.time;
                Next::Apply(key, event)
            }
            // Unreachable after a successful peek; treat as drained.
            Err(EmptyQueue) => Next::Drained,
        }
    }

    /// Apply one event: observer hooks, sink dispatch, follow-up insertion,
    /// statistics. The apply is side-effect-complete before the loop moves
    /// on; no lock is held while the sink runs.
    fn apply_event(&mut self, key: EventKey, event: Event) {
        if !self.batch_open {
            self.observer.on_before_event_batch(key.time);
            self.batch_open = true;
        }
        self.emit_keyframes(key.time);

        let kind = event.kind();
        trace!(
            time = %key.time,
            sequence = key.sequence,
            kind = event.type_name(),
            "applying event"
        );

        let follow_ups = self.sink.apply(key.time, event);

        let mut inner = self.shared.lock();
        inner.stats.events_applied += 1;
        inner.stats.events_by_kind[kind as usize] += 1;
        for scheduled in follow_ups {
            inner.queue.insert(scheduled.fire_at, scheduled.event);
            inner.stats.events_scheduled += 1;
        }
        let len = inner.queue.len();
        inner.stats.peak_queue_len = inner.stats.peak_queue_len.max(len);
    }

    /// Emit keyframe notifications for every boundary the clock has crossed.
    fn emit_keyframes(&mut self, date: SimTime) {
        let Some(interval) = self.config.keyframe_interval else {
            return;
        };
        while let Some(next) = self.next_keyframe {
            if date < next {
                break;
            }
            self.observer.on_keyframe_boundary(date);
            self.keyframes_emitted += 1;
            self.next_keyframe = Some(next + interval.as_duration());
        }
    }

    /// Handle a drained queue. Returns the termination reason when the run
    /// should end, otherwise idles briefly awaiting injected events.
    fn quiesce(&mut self) -> Option<&'static str> {
        match self.config.length {
            RunLength::Bounded => Some("event queue drained"),
            RunLength::Unbounded => {
                if self.config.auto_stop {
                    Some("quiescence reached")
                } else {
                    self.batch_open = false;
                    self.idle_wait();
                    None
                }
            }
        }
    }

    /// Block while the scheduler is paused. Returns the wall time spent
    /// paused, or `None` if a stop was requested while waiting.
    fn wait_while_paused(&mut self) -> Option<Duration> {
        {
            let inner = self.shared.lock();
            if inner.state != SchedulerState::Paused {
                return Some(Duration::ZERO);
            }
        }

        self.batch_open = false;
        debug!("scheduler paused");
        let pause_begin = Instant::now();

        let mut inner = self.shared.lock();
        while inner.state == SchedulerState::Paused && !self.stop_requested() {
            inner = self.shared.wait(inner);
        }
        drop(inner);

        if self.stop_requested() {
            return None;
        }
        debug!("scheduler resumed");
        Some(pause_begin.elapsed())
    }

    /// Bounded sleep on the shared condition variable, so stop requests,
    /// resumes, and injected events wake the worker immediately.
    fn idle_wait(&self) {
        let inner = self.shared.lock();
        let _ = self
            .shared
            .signal
            .wait_timeout(inner, POLL_INTERVAL)
            .expect("scheduler state lock poisoned");
    }

    fn stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::Relaxed)
    }

    /// A bounded run ends exactly at the maximum date when the next event
    /// fires beyond it; the late event is never applied.
    fn clamp_to_maximum_date(&self) {
        if let Some(maximum_date) = self.config.maximum_date {
            let mut inner = self.shared.lock();
            if inner.current_date < maximum_date {
                inner.current_date = maximum_date;
            }
        }
    }

    fn fail(&mut self, violation: CausalityViolation) {
        error!(
            event_time = %violation.event_time,
            current_date = %violation.current_date,
            "causality violation: event producer scheduled into the past"
        );
        self.shared.lock().fault = Some(violation);
        self.end_run("causality violation");
    }

    /// `→ Ended`: terminal. Records final statistics, wakes any waiting
    /// driver, and notifies the observer exactly once.
    fn end_run(&mut self, reason: &str) {
        let (final_date, events_applied, queue_remaining) = {
            let mut inner = self.shared.lock();
            inner.state = SchedulerState::Ended;
            inner.stats.keyframes_emitted = self.keyframes_emitted;
            (
                inner.current_date,
                inner.stats.events_applied,
                inner.queue.len(),
            )
        };
        self.shared.signal.notify_all();

        info!(
            reason,
            final_date = %final_date,
            events_applied,
            queue_remaining,
            "scheduler ended"
        );
        self.observer
            .on_terminate(final_date, events_applied, queue_remaining);
    }
}
