//! Event types for the deterministic kernel.

use crate::Message;
use modgrid_types::{Direction, LatticeCell, ModuleId, Orientation};

/// All event kinds the kernel can schedule and apply.
///
/// Events are **passive data** — they describe something that happens at a
/// firing time. They are created by whichever component schedules them,
/// owned by the event queue until popped, consumed exactly once by the apply
/// step, and never mutated while queued.
#[derive(Debug, Clone)]
pub enum Event {
    /// A message reaches a module's network interface.
    ///
    /// Produced by the network link for every send; fires at
    /// `send time + latency + jitter`.
    MessageArrival {
        to: ModuleId,
        /// Receiving interface on the target module.
        port: Direction,
        message: Message,
    },

    /// A module begins a motion toward a destination cell.
    ///
    /// Applying this detaches the module from its neighbors and schedules
    /// the matching [`Event::MotionEnd`].
    MotionStart {
        module: ModuleId,
        destination: LatticeCell,
        orientation: Orientation,
    },

    /// A module's motion completes and it reattaches at its destination.
    MotionEnd { module: ModuleId },

    /// A neighbor appeared on one of a module's interfaces.
    NeighborAdded {
        module: ModuleId,
        port: Direction,
        neighbor: ModuleId,
    },

    /// A neighbor disappeared from one of a module's interfaces.
    NeighborRemoved {
        module: ModuleId,
        port: Direction,
        neighbor: ModuleId,
    },

    /// Drive a module's control program.
    ///
    /// The first delivery to a module runs its startup hook; subsequent
    /// deliveries run its periodic step hook.
    ControlStep { module: ModuleId },
}

/// Dense discriminant for [`Event`], used to index per-kind statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum EventKind {
    MessageArrival = 0,
    MotionStart = 1,
    MotionEnd = 2,
    NeighborAdded = 3,
    NeighborRemoved = 4,
    ControlStep = 5,
}

impl EventKind {
    /// Number of event kinds.
    pub const COUNT: usize = 6;

    pub const fn name(self) -> &'static str {
        match self {
            EventKind::MessageArrival => "MessageArrival",
            EventKind::MotionStart => "MotionStart",
            EventKind::MotionEnd => "MotionEnd",
            EventKind::NeighborAdded => "NeighborAdded",
            EventKind::NeighborRemoved => "NeighborRemoved",
            EventKind::ControlStep => "ControlStep",
        }
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MessageArrival { .. } => EventKind::MessageArrival,
            Event::MotionStart { .. } => EventKind::MotionStart,
            Event::MotionEnd { .. } => EventKind::MotionEnd,
            Event::NeighborAdded { .. } => EventKind::NeighborAdded,
            Event::NeighborRemoved { .. } => EventKind::NeighborRemoved,
            Event::ControlStep { .. } => EventKind::ControlStep,
        }
    }

    /// The module this event is addressed to.
    pub fn target(&self) -> ModuleId {
        match self {
            Event::MessageArrival { to, .. } => *to,
            Event::MotionStart { module, .. }
            | Event::MotionEnd { module }
            | Event::NeighborAdded { module, .. }
            | Event::NeighborRemoved { module, .. }
            | Event::ControlStep { module } => *module,
        }
    }

    /// The event kind name for telemetry.
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_target() {
        let ev = Event::ControlStep {
            module: ModuleId(7),
        };
        assert_eq!(ev.kind(), EventKind::ControlStep);
        assert_eq!(ev.target(), ModuleId(7));
        assert_eq!(ev.type_name(), "ControlStep");
    }

    #[test]
    fn test_kind_indices_are_dense() {
        let kinds = [
            EventKind::MessageArrival,
            EventKind::MotionStart,
            EventKind::MotionEnd,
            EventKind::NeighborAdded,
            EventKind::NeighborRemoved,
            EventKind::ControlStep,
        ];
        for (i, kind) in kinds.into_iter().enumerate() {
            assert_eq!(kind as usize, i);
        }
        assert_eq!(kinds.len(), EventKind::COUNT);
    }
}
