//! The world: module table, topology, and event dispatch.

use crate::error::WorldError;
use crate::lattice::Lattice;
use crate::module::{ModuleCode, ModuleContext, ModuleState};
use modgrid_core::{Event, EventSink, Message, ScheduledEvent};
use modgrid_types::{Direction, GridDims, LatticeCell, ModuleId, Orientation, SimTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};

/// World configuration, consumed from the external loader.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub dims: GridDims,
    /// Seed for the simulation RNG. All randomized decisions during a run
    /// (delivery jitter) are reproducible from this seed alone.
    pub seed: u64,
    /// How long a motion takes from start to completion.
    pub motion_duration: Duration,
}

impl WorldConfig {
    pub fn new(dims: GridDims, seed: u64) -> Self {
        WorldConfig {
            dims,
            seed,
            motion_duration: Duration::from_secs(1),
        }
    }

    pub fn with_motion_duration(mut self, motion_duration: Duration) -> Self {
        self.motion_duration = motion_duration;
        self
    }
}

/// Counters maintained by the world across a run.
#[derive(Debug, Default, Clone)]
pub struct WorldStats {
    /// Messages scheduled for delivery (every send produces exactly one).
    pub messages_sent: u64,
    /// Motions that ran to completion.
    pub motions_completed: u64,
}

struct Slot {
    state: ModuleState,
    /// Taken out while the control program runs, put back after.
    code: Option<Box<dyn ModuleCode>>,
    /// Whether the first control step (startup) has been delivered.
    started: bool,
}

/// The simulated world: lattice, modules, and their control programs.
///
/// Implements [`EventSink`]; the scheduler owns the queue and the clock,
/// the world owns everything the events mutate.
pub struct World {
    lattice: Lattice,
    slots: Vec<Slot>,
    rng: ChaCha8Rng,
    motion_duration: Duration,
    /// Destination and orientation of each in-flight motion, recorded at
    /// motion start and consumed at motion end.
    pending_motions: HashMap<ModuleId, (LatticeCell, Orientation)>,
    stats: WorldStats,
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        let lattice = Lattice::new(config.dims)?;
        info!(
            dims = ?config.dims,
            seed = config.seed,
            "created world"
        );
        Ok(World {
            lattice,
            slots: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            motion_duration: config.motion_duration,
            pending_motions: HashMap::new(),
            stats: WorldStats::default(),
        })
    }

    /// Place a module on the lattice.
    ///
    /// Ports are wired silently to modules already present on adjacent
    /// cells: initial connectivity is configuration, not events. Attributes
    /// carry per-module starting parameters from the loader.
    pub fn add_module(
        &mut self,
        cell: LatticeCell,
        orientation: Orientation,
        code: Box<dyn ModuleCode>,
        attributes: BTreeMap<String, String>,
    ) -> Result<ModuleId, WorldError> {
        if !self.lattice.contains(cell) {
            return Err(WorldError::CellOutOfBounds(cell));
        }
        if self.lattice.occupant(cell).is_some() {
            return Err(WorldError::CellOccupied(cell));
        }

        let id = ModuleId(self.slots.len() as u32);
        let mut state = ModuleState::new(id, cell, orientation, attributes);

        for port in Direction::ALL {
            if let Some(neighbor) = self.lattice.occupant(cell.neighbor(port)) {
                state.ports[port.index()] = Some(neighbor);
                self.slots[neighbor.index()].state.ports[port.opposite().index()] = Some(id);
            }
        }

        self.lattice.place(cell, id);
        self.slots.push(Slot {
            state,
            code: Some(code),
            started: false,
        });
        debug!(module = %id, %cell, "module placed");
        Ok(id)
    }

    /// One control step per module at date zero, to seed the scheduler
    /// before the run starts.
    pub fn startup_events(&self) -> Vec<ScheduledEvent> {
        self.slots
            .iter()
            .map(|slot| {
                ScheduledEvent::new(
                    SimTime::ZERO,
                    Event::ControlStep {
                        module: slot.state.id,
                    },
                )
            })
            .collect()
    }

    pub fn module(&self, id: ModuleId) -> Option<&ModuleState> {
        self.slots.get(id.index()).map(|slot| &slot.state)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleState> {
        self.slots.iter().map(|slot| &slot.state)
    }

    pub fn module_count(&self) -> usize {
        self.slots.len()
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }

    /// Run a control-program hook for one module.
    ///
    /// The boxed code is taken out of its slot for the duration of the call
    /// so the context can borrow the module's state mutably.
    fn with_code(
        &mut self,
        id: ModuleId,
        now: SimTime,
        out: &mut Vec<ScheduledEvent>,
        hook: impl FnOnce(&mut dyn ModuleCode, &mut ModuleContext<'_>),
    ) {
        let idx = id.index();
        let Some(mut code) = self.slots[idx].code.take() else {
            return;
        };
        {
            let mut ctx = ModuleContext {
                now,
                state: &mut self.slots[idx].state,
                lattice: &self.lattice,
                rng: &mut self.rng,
                out,
                messages_sent: &mut self.stats.messages_sent,
            };
            hook(code.as_mut(), &mut ctx);
        }
        self.slots[idx].code = Some(code);
    }

    fn slot_exists(&self, id: ModuleId, context: &'static str) -> bool {
        let known = id.index() < self.slots.len();
        if !known {
            warn!(module = %id, context, "event addressed to unknown module");
        }
        known
    }

    fn wire(&mut self, module: ModuleId, port: Direction, neighbor: ModuleId) {
        self.slots[module.index()].state.ports[port.index()] = Some(neighbor);
        self.slots[neighbor.index()].state.ports[port.opposite().index()] = Some(module);
    }

    fn unwire(&mut self, module: ModuleId, port: Direction, neighbor: ModuleId) {
        self.slots[module.index()].state.ports[port.index()] = None;
        let back = port.opposite().index();
        if self.slots[neighbor.index()].state.ports[back] == Some(module) {
            self.slots[neighbor.index()].state.ports[back] = None;
        }
    }

    fn deliver_message(
        &mut self,
        now: SimTime,
        to: ModuleId,
        port: Direction,
        message: Message,
        out: &mut Vec<ScheduledEvent>,
    ) {
        if !self.slot_exists(to, "message arrival") {
            return;
        }
        self.with_code(to, now, out, |code, ctx| {
            code.on_message(&message, port, ctx);
        });
    }

    /// Motion start: detach from every neighbor, vacate the cell, and
    /// schedule the completion. Both sides of each severed link get a
    /// neighbor-removed notification at the current date.
    fn begin_motion(
        &mut self,
        now: SimTime,
        module: ModuleId,
        destination: LatticeCell,
        orientation: Orientation,
        out: &mut Vec<ScheduledEvent>,
    ) {
        if !self.slot_exists(module, "motion start") {
            return;
        }
        if self.slots[module.index()].state.in_motion {
            warn!(%module, "motion start ignored: module already in motion");
            return;
        }
        if !self.lattice.is_free(destination) {
            warn!(%module, %destination, "motion start ignored: destination unavailable");
            return;
        }

        for port in Direction::ALL {
            if let Some(neighbor) = self.slots[module.index()].state.ports[port.index()] {
                self.unwire(module, port, neighbor);
                out.push(ScheduledEvent::new(
                    now,
                    Event::NeighborRemoved {
                        module,
                        port,
                        neighbor,
                    },
                ));
                out.push(ScheduledEvent::new(
                    now,
                    Event::NeighborRemoved {
                        module: neighbor,
                        port: port.opposite(),
                        neighbor: module,
                    },
                ));
            }
        }

        let origin = self.slots[module.index()].state.cell;
        self.lattice.clear(origin);
        self.slots[module.index()].state.in_motion = true;
        self.pending_motions.insert(module, (destination, orientation));
        out.push(ScheduledEvent::new(
            now + self.motion_duration,
            Event::MotionEnd { module },
        ));
        debug!(%module, from = %origin, to = %destination, "motion started");
    }

    /// Motion end: occupy the destination, reattach to adjacent modules,
    /// notify both sides of each new link, then run the module's own
    /// completion hook.
    fn finish_motion(&mut self, now: SimTime, module: ModuleId, out: &mut Vec<ScheduledEvent>) {
        if !self.slot_exists(module, "motion end") {
            return;
        }
        let Some((destination, orientation)) = self.pending_motions.remove(&module) else {
            warn!(%module, "motion end without a pending motion");
            return;
        };

        {
            let state = &mut self.slots[module.index()].state;
            state.cell = destination;
            state.orientation = orientation;
            state.in_motion = false;
        }
        self.lattice.place(destination, module);
        self.stats.motions_completed += 1;

        for port in Direction::ALL {
            if let Some(neighbor) = self.lattice.occupant(destination.neighbor(port)) {
                self.wire(module, port, neighbor);
                out.push(ScheduledEvent::new(
                    now,
                    Event::NeighborAdded {
                        module,
                        port,
                        neighbor,
                    },
                ));
                out.push(ScheduledEvent::new(
                    now,
                    Event::NeighborAdded {
                        module: neighbor,
                        port: port.opposite(),
                        neighbor: module,
                    },
                ));
            }
        }
        debug!(%module, cell = %destination, "motion completed");

        self.with_code(module, now, out, |code, ctx| code.on_motion_end(ctx));
    }

    /// Neighbor events mutate the target module's port table (idempotently;
    /// motions pre-wire both sides) and run the notification hook. Injected
    /// standalone, they support driver-driven topology edits.
    fn neighbor_added(
        &mut self,
        now: SimTime,
        module: ModuleId,
        port: Direction,
        neighbor: ModuleId,
        out: &mut Vec<ScheduledEvent>,
    ) {
        if !self.slot_exists(module, "neighbor added") {
            return;
        }
        self.slots[module.index()].state.ports[port.index()] = Some(neighbor);
        self.with_code(module, now, out, |code, ctx| {
            code.on_neighbor_added(port, neighbor, ctx);
        });
    }

    fn neighbor_removed(
        &mut self,
        now: SimTime,
        module: ModuleId,
        port: Direction,
        neighbor: ModuleId,
        out: &mut Vec<ScheduledEvent>,
    ) {
        if !self.slot_exists(module, "neighbor removed") {
            return;
        }
        let entry = &mut self.slots[module.index()].state.ports[port.index()];
        if *entry == Some(neighbor) {
            *entry = None;
        }
        self.with_code(module, now, out, |code, ctx| {
            code.on_neighbor_removed(port, neighbor, ctx);
        });
    }

    fn control_step(&mut self, now: SimTime, module: ModuleId, out: &mut Vec<ScheduledEvent>) {
        if !self.slot_exists(module, "control step") {
            return;
        }
        let slot = &mut self.slots[module.index()];
        let first = !slot.started;
        slot.started = true;
        self.with_code(module, now, out, |code, ctx| {
            if first {
                code.on_startup(ctx);
            } else {
                code.on_step(ctx);
            }
        });
    }
}

impl EventSink for World {
    fn apply(&mut self, now: SimTime, event: Event) -> Vec<ScheduledEvent> {
        let mut out = Vec::new();
        match event {
            Event::MessageArrival { to, port, message } => {
                self.deliver_message(now, to, port, message, &mut out)
            }
            Event::MotionStart {
                module,
                destination,
                orientation,
            } => self.begin_motion(now, module, destination, orientation, &mut out),
            Event::MotionEnd { module } => self.finish_motion(now, module, &mut out),
            Event::NeighborAdded {
                module,
                port,
                neighbor,
            } => self.neighbor_added(now, module, port, neighbor, &mut out),
            Event::NeighborRemoved {
                module,
                port,
                neighbor,
            } => self.neighbor_removed(now, module, port, neighbor, &mut out),
            Event::ControlStep { module } => self.control_step(now, module, &mut out),
        }
        out
    }
}
