//! modgrid simulator CLI
//!
//! Run deterministic lattice-robot simulations with configurable
//! parameters.
//!
//! # Example
//!
//! ```bash
//! # Run a deterministic gradient election with a fixed seed
//! modgrid-sim --seed 42 -n 8 --max-date-ms 60000
//!
//! # Pace the same run against the wall clock
//! modgrid-sim --seed 42 -n 8 --pacing real-time --max-date-ms 10000
//! ```

use clap::{Parser, ValueEnum};
use modgrid_kernel::{
    PacingMode, Scheduler, SchedulerConfig, SchedulerControl, SchedulerState, SimObserver,
};
use modgrid_simulator::GradientCode;
use modgrid_types::{GridDims, LatticeCell, Orientation, SimTime};
use modgrid_world::{World, WorldConfig};
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// modgrid simulator
///
/// Runs a population of lattice robots under the deterministic event
/// kernel. Reproducible whenever the same seed and configuration are used.
#[derive(Parser, Debug)]
#[command(name = "modgrid-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Lattice width (x cells)
    #[arg(long, default_value = "16")]
    width: u32,

    /// Lattice height (y cells)
    #[arg(long, default_value = "8")]
    height: u32,

    /// Lattice depth (z cells)
    #[arg(long, default_value = "1")]
    depth: u32,

    /// Number of modules, placed row by row from the origin
    #[arg(short = 'n', long, default_value = "8")]
    modules: u32,

    /// Random seed for reproducible runs. When omitted, a random seed is
    /// generated and echoed.
    #[arg(long)]
    seed: Option<u64>,

    /// Pacing mode
    #[arg(long, value_enum, default_value = "run-ahead")]
    pacing: PacingArg,

    /// Maximum simulated date in milliseconds (bounded run)
    #[arg(long)]
    max_date_ms: Option<u64>,

    /// Keep running after the queue drains, waiting for injected events
    #[arg(long)]
    unbounded: bool,

    /// With --unbounded, end the run when the queue drains
    #[arg(long)]
    auto_stop: bool,

    /// Keyframe interval in milliseconds for the replay observer
    #[arg(long)]
    keyframe_ms: Option<u64>,

    /// Motion duration in milliseconds
    #[arg(long, default_value = "1000")]
    motion_ms: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PacingArg {
    RunAhead,
    RealTime,
}

impl From<PacingArg> for PacingMode {
    fn from(arg: PacingArg) -> Self {
        match arg {
            PacingArg::RunAhead => PacingMode::RunAhead,
            PacingArg::RealTime => PacingMode::RealTimePaced,
        }
    }
}

/// Logs keyframes and the final report as they happen.
struct ConsoleObserver;

impl SimObserver for ConsoleObserver {
    fn on_keyframe_boundary(&mut self, current_date: SimTime) {
        debug!(date = %current_date, "keyframe");
    }

    fn on_terminate(&mut self, final_date: SimTime, events_applied: u64, queue_size_at_end: usize) {
        info!(
            final_date = %final_date,
            events_applied,
            queue_size_at_end,
            "simulation ended"
        );
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("warn,modgrid_sim=info,modgrid_simulator=info,modgrid_kernel=info")
        }))
        .init();

    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        width = args.width,
        height = args.height,
        depth = args.depth,
        modules = args.modules,
        seed,
        pacing = ?args.pacing,
        "starting simulation"
    );

    // Build the world: modules in a row-major block, module 0 seeds the
    // gradient round.
    let dims = GridDims::new(args.width, args.height, args.depth);
    let world_config =
        WorldConfig::new(dims, seed).with_motion_duration(Duration::from_millis(args.motion_ms));
    let mut world = World::new(world_config).expect("failed to create world");

    for i in 0..args.modules {
        let cell = LatticeCell::new((i % args.width) as i32, (i / args.width) as i32, 0);
        let mut attributes = BTreeMap::new();
        if i == 0 {
            attributes.insert("seed".to_string(), "true".to_string());
        }
        world
            .add_module(cell, Orientation(0), Box::new(GradientCode::new()), attributes)
            .expect("failed to place module");
    }
    let startup_events = world.startup_events();

    // Configure the scheduler.
    let mut scheduler_config = SchedulerConfig::new(args.pacing.into());
    if args.unbounded {
        scheduler_config = scheduler_config.with_unbounded();
        if args.auto_stop {
            scheduler_config = scheduler_config.with_auto_stop();
        } else {
            warn!("unbounded run without --auto-stop only ends on Ctrl-C");
        }
    }
    if let Some(max_date_ms) = args.max_date_ms {
        scheduler_config = scheduler_config.with_maximum_date(SimTime::from_millis(max_date_ms));
    }
    if let Some(keyframe_ms) = args.keyframe_ms {
        scheduler_config =
            scheduler_config.with_keyframe_interval(SimTime::from_millis(keyframe_ms));
    }

    let scheduler =
        Scheduler::spawn_with_observer(scheduler_config, world, Box::new(ConsoleObserver))
            .expect("failed to spawn scheduler");
    for scheduled in startup_events {
        scheduler.schedule_at(scheduled.fire_at, scheduled.event);
    }
    scheduler.start().expect("failed to start scheduler");

    while scheduler.current_state() != SchedulerState::Ended {
        thread::sleep(Duration::from_millis(20));
    }

    let stats = scheduler.stats();
    if let Some(fault) = scheduler.fault() {
        warn!(%fault, "run ended on a causality fault");
    }
    let world = scheduler.join();

    info!(
        events_applied = stats.events_applied,
        events_scheduled = stats.events_scheduled,
        peak_queue_len = stats.peak_queue_len,
        messages_sent = world.stats().messages_sent,
        motions_completed = world.stats().motions_completed,
        "final statistics"
    );

    for module in world.modules() {
        debug!(
            module = %module.id(),
            cell = %module.cell(),
            distance = module.attribute("distance").unwrap_or("-"),
            leader = module.attribute("leader").unwrap_or("false"),
            "module state"
        );
    }
    if let Some(leader) = world.modules().find(|m| m.attribute("leader").is_some()) {
        info!(leader = %leader.id(), cell = %leader.cell(), "elected leader");
    };
}
