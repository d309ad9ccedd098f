//! Tests for deterministic scheduling.
//!
//! These verify the core reproducibility property: given the same seed and
//! configuration, the kernel applies the same events in the same order,
//! every run, in either pacing mode.

mod common;

use common::{RelaySink, TraceEntry};
use modgrid_core::{Event, EventKind};
use modgrid_kernel::{PacingMode, Scheduler, SchedulerConfig, SchedulerControl};
use modgrid_types::{ModuleId, SimTime};

const RING: u32 = 4;

/// Run a relay-ring simulation to completion and return its trace and the
/// kernel statistics.
fn run_ring(pacing: PacingMode, seed: u64) -> (Vec<TraceEntry>, modgrid_kernel::SchedulerStats) {
    let config = SchedulerConfig::new(pacing);
    let scheduler = Scheduler::spawn(config, RelaySink::new(RING, seed)).unwrap();

    for module in 0..RING {
        scheduler.schedule_at(
            SimTime::from_micros(100 + module as u64),
            Event::ControlStep {
                module: ModuleId(module),
            },
        );
    }

    scheduler.start().unwrap();
    common::wait_for("run to end", || {
        scheduler.current_state() == modgrid_kernel::SchedulerState::Ended
    });
    let stats = scheduler.stats();
    let sink = scheduler.join();
    (sink.trace, stats)
}

#[test]
fn test_run_ahead_trace_is_reproducible() {
    let (trace1, stats1) = run_ring(PacingMode::RunAhead, 12345);
    let (trace2, stats2) = run_ring(PacingMode::RunAhead, 12345);

    assert!(!trace1.is_empty(), "ring should generate events");
    assert_eq!(trace1, trace2, "same seed must produce the same trace");
    assert_eq!(stats1.events_applied, stats2.events_applied);
    assert_eq!(stats1.events_by_kind, stats2.events_by_kind);
    assert_eq!(stats1.events_scheduled, stats2.events_scheduled);
}

#[test]
fn test_different_seeds_diverge() {
    let (trace1, _) = run_ring(PacingMode::RunAhead, 111);
    let (trace2, _) = run_ring(PacingMode::RunAhead, 222);

    // Same event counts (the ring shape is fixed), different arrival times.
    assert_eq!(trace1.len(), trace2.len());
    assert_ne!(trace1, trace2, "different seeds should change the timing");
}

#[test]
fn test_real_time_matches_run_ahead() {
    // Pacing changes when events apply in wall-clock terms, never their
    // relative order: the traces must be identical entry for entry.
    let (ahead, _) = run_ring(PacingMode::RunAhead, 999);
    let (paced, _) = run_ring(PacingMode::RealTimePaced, 999);

    assert_eq!(ahead, paced);
}

#[test]
fn test_trace_times_never_regress() {
    let (trace, _) = run_ring(PacingMode::RunAhead, 42);
    for window in trace.windows(2) {
        assert!(
            window[0].time <= window[1].time,
            "applied times must be non-decreasing: {window:?}"
        );
    }
}

#[test]
fn test_stats_match_trace() {
    let (trace, stats) = run_ring(PacingMode::RunAhead, 77);

    assert_eq!(stats.events_applied as usize, trace.len());
    let arrivals = trace
        .iter()
        .filter(|e| e.kind == EventKind::MessageArrival)
        .count();
    assert_eq!(stats.applied_of(EventKind::MessageArrival) as usize, arrivals);
    assert_eq!(
        stats.applied_of(EventKind::ControlStep),
        RING as u64,
        "one control step per ring member"
    );
    // Every scheduled event was applied: the run ended by draining.
    assert_eq!(stats.events_unapplied(), 0);
}
