//! Module state, control-program trait, and the module-facing API.

use crate::error::SendError;
use crate::lattice::Lattice;
use crate::link::{Endpoint, NetworkLink};
use modgrid_core::{Event, Message, MessageKind, ScheduledEvent};
use modgrid_types::{Direction, LatticeCell, ModuleId, Orientation, SimTime};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// State of one module on the lattice.
///
/// Neighbor relations are stored as `ModuleId`s in the per-port table and
/// resolved through the world's module table; modules never hold references
/// to each other.
#[derive(Debug)]
pub struct ModuleState {
    pub(crate) id: ModuleId,
    pub(crate) cell: LatticeCell,
    pub(crate) orientation: Orientation,
    pub(crate) ports: [Option<ModuleId>; Direction::COUNT],
    pub(crate) in_motion: bool,
    pub(crate) attributes: BTreeMap<String, String>,
}

impl ModuleState {
    pub(crate) fn new(
        id: ModuleId,
        cell: LatticeCell,
        orientation: Orientation,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        ModuleState {
            id,
            cell,
            orientation,
            ports: [None; Direction::COUNT],
            in_motion: false,
            attributes,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn cell(&self) -> LatticeCell {
        self.cell
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn in_motion(&self) -> bool {
        self.in_motion
    }

    /// The neighbor connected on a port, if any.
    pub fn neighbor(&self, port: Direction) -> Option<ModuleId> {
        self.ports[port.index()]
    }

    /// Connected ports in the fixed direction order.
    pub fn connected_ports(&self) -> Vec<(Direction, ModuleId)> {
        Direction::ALL
            .into_iter()
            .filter_map(|port| self.ports[port.index()].map(|n| (port, n)))
            .collect()
    }

    pub fn neighbor_count(&self) -> usize {
        self.ports.iter().filter(|p| p.is_some()).count()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// A module's control program.
///
/// Hooks are invoked by the world while the scheduler applies events
/// addressed to the module. They run strictly serialized with every other
/// apply in the simulation and must complete without blocking; all effects
/// go through the [`ModuleContext`], which turns them into future events.
#[allow(unused_variables)]
pub trait ModuleCode: Send {
    /// First control step delivered to the module.
    fn on_startup(&mut self, ctx: &mut ModuleContext<'_>);

    /// Subsequent control steps (scheduled via
    /// [`ModuleContext::schedule_step`]).
    fn on_step(&mut self, ctx: &mut ModuleContext<'_>) {}

    /// A message arrived on one of the module's ports.
    fn on_message(&mut self, message: &Message, from: Direction, ctx: &mut ModuleContext<'_>) {}

    /// The module's own motion completed.
    fn on_motion_end(&mut self, ctx: &mut ModuleContext<'_>) {}

    /// A neighbor appeared on a port.
    fn on_neighbor_added(&mut self, port: Direction, neighbor: ModuleId, ctx: &mut ModuleContext<'_>) {
    }

    /// A neighbor disappeared from a port.
    fn on_neighbor_removed(
        &mut self,
        port: Direction,
        neighbor: ModuleId,
        ctx: &mut ModuleContext<'_>,
    ) {
    }
}

/// Message-handler callback: `(code, message, receiving port, context)`.
pub type MessageHandler<C> = fn(&mut C, &Message, Direction, &mut ModuleContext<'_>);

/// Per-kind message dispatch table for a control program.
///
/// Control programs register handlers at construction and dispatch from
/// `on_message`. Plain function pointers keep the registry `Send` and the
/// control program inspectable.
pub struct HandlerRegistry<C> {
    handlers: HashMap<MessageKind, MessageHandler<C>>,
}

impl<C> HandlerRegistry<C> {
    pub fn new() -> Self {
        HandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for a message kind, replacing any previous one.
    pub fn register(&mut self, kind: MessageKind, handler: MessageHandler<C>) {
        self.handlers.insert(kind, handler);
    }

    /// Invoke the handler for the message's kind. Returns false when no
    /// handler is registered for it.
    pub fn dispatch(
        &self,
        code: &mut C,
        message: &Message,
        from: Direction,
        ctx: &mut ModuleContext<'_>,
    ) -> bool {
        match self.handlers.get(&message.kind()) {
            Some(handler) => {
                handler(code, message, from, ctx);
                true
            }
            None => false,
        }
    }
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        HandlerRegistry::new()
    }
}

/// The API a control program sees while handling an event.
///
/// Every effect — sends, motions, future steps — is expressed as a
/// scheduled event collected into the current apply's outbox; nothing
/// happens out-of-band.
pub struct ModuleContext<'a> {
    pub(crate) now: SimTime,
    pub(crate) state: &'a mut ModuleState,
    pub(crate) lattice: &'a Lattice,
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) out: &'a mut Vec<ScheduledEvent>,
    pub(crate) messages_sent: &'a mut u64,
}

impl ModuleContext<'_> {
    /// Current simulation date.
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn id(&self) -> ModuleId {
        self.state.id
    }

    pub fn state(&self) -> &ModuleState {
        self.state
    }

    /// Send a message out of one port.
    ///
    /// The arrival is scheduled at `now + latency + jitter` on the neighbor
    /// currently connected to the port; jitter is drawn from the seeded
    /// simulation RNG, bounded by `jitter_bound`.
    pub fn send(
        &mut self,
        message: Message,
        port: Direction,
        latency: Duration,
        jitter_bound: Duration,
    ) -> Result<(), SendError> {
        let Some(neighbor) = self.state.ports[port.index()] else {
            return Err(SendError::PortNotConnected {
                module: self.state.id,
                port,
            });
        };
        let link = NetworkLink {
            from: Endpoint {
                module: self.state.id,
                port,
            },
            to: Endpoint {
                module: neighbor,
                port: port.opposite(),
            },
        };
        self.out
            .push(link.schedule_delivery(message, latency, jitter_bound, self.now, self.rng));
        *self.messages_sent += 1;
        Ok(())
    }

    /// Broadcast to every connected neighbor.
    ///
    /// Returns the number of interfaces addressed, which fan-out/fan-in
    /// protocols use as their pending-acknowledgment count.
    pub fn send_to_all_neighbors(
        &mut self,
        message: &Message,
        latency: Duration,
        jitter_bound: Duration,
    ) -> usize {
        self.send_to_all_neighbors_except(message, latency, jitter_bound, None)
    }

    /// Broadcast to every connected neighbor except one port (typically the
    /// one the triggering message came in on).
    pub fn send_to_all_neighbors_except(
        &mut self,
        message: &Message,
        latency: Duration,
        jitter_bound: Duration,
        except: Option<Direction>,
    ) -> usize {
        let mut addressed = 0;
        for port in Direction::ALL {
            if Some(port) == except {
                continue;
            }
            if self.state.ports[port.index()].is_none() {
                continue;
            }
            if self
                .send(message.clone(), port, latency, jitter_bound)
                .is_ok()
            {
                addressed += 1;
            }
        }
        addressed
    }

    /// Schedule the start of a motion toward a destination cell.
    ///
    /// Validation (bounds, occupancy) happens when the motion-start event
    /// applies; an invalid destination is logged and dropped there.
    pub fn start_motion(&mut self, destination: LatticeCell, orientation: Orientation) {
        self.out.push(ScheduledEvent::new(
            self.now,
            Event::MotionStart {
                module: self.state.id,
                destination,
                orientation,
            },
        ));
    }

    /// Schedule a future control step for this module.
    pub fn schedule_step(&mut self, delay: Duration) {
        self.out.push(ScheduledEvent::new(
            self.now + delay,
            Event::ControlStep {
                module: self.state.id,
            },
        ));
    }

    /// Schedule an arbitrary non-message event.
    pub fn schedule(&mut self, fire_at: SimTime, event: Event) {
        self.out.push(ScheduledEvent::new(fire_at, event));
    }

    /// The neighbor connected on a port, if any.
    pub fn neighbor(&self, port: Direction) -> Option<ModuleId> {
        self.state.neighbor(port)
    }

    /// Connected ports in the fixed direction order.
    pub fn connected_ports(&self) -> Vec<(Direction, ModuleId)> {
        self.state.connected_ports()
    }

    /// Adjacent cells that are inside the lattice and unoccupied, in the
    /// fixed direction order.
    pub fn free_neighbor_cells(&self) -> Vec<(Direction, LatticeCell)> {
        Direction::ALL
            .into_iter()
            .filter_map(|port| {
                let cell = self.state.cell.neighbor(port);
                self.lattice.is_free(cell).then_some((port, cell))
            })
            .collect()
    }

    /// Set a named attribute on the module, visible to external inspection.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        self.state.attributes.insert(key.to_string(), value.into());
    }
}
