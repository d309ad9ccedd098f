//! Distance-gradient spanning tree with leader election.
//!
//! Reference control program exercising the full module-facing API. One
//! module is marked as the round seed through its `seed` starting attribute.
//! At startup it floods a distance broadcast; every module adopts the sender
//! of its first (or newer-round) distance message as its spanning-tree
//! parent, rebroadcasts with distance + 1, and counts the broadcast fan-out
//! as pending acknowledgments. Leaves acknowledge immediately; interior
//! modules fold the maximum leaf distance (and the module it belongs to) up
//! the tree as their own counts drain. When the root's count reaches zero it
//! has elected the farthest leaf, announces it down the tree, and the
//! elected module performs one motion into a free neighboring cell.
//!
//! The per-module state machine:
//!
//! ```text
//! startup(seed) ──► broadcast DISTANCE(0, round 1), pending = fan-out
//! DISTANCE(d,r) ──► adopt parent / rebroadcast, or ack non-child
//! ACK           ──► pending -= 1; fold max leaf; at 0: ack up, or elect
//! LEADER(id)    ──► me: move once; else: forward to children
//! ```

use modgrid_core::{Message, MessageKind};
use modgrid_types::{Direction, ModuleId, Orientation};
use modgrid_world::{HandlerRegistry, ModuleCode, ModuleContext};
use std::mem;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DISTANCE_MSG: MessageKind = MessageKind(1);
pub const ACK_MSG: MessageKind = MessageKind(2);
pub const LEADER_MSG: MessageKind = MessageKind(3);

/// Per-hop delivery latency.
const LATENCY: Duration = Duration::from_micros(1_000);
/// Per-hop jitter bound; drawn from the seeded simulation RNG.
const JITTER: Duration = Duration::from_micros(100);

struct DistanceMsg {
    distance: u32,
    round: u32,
}

struct AckMsg {
    /// True when the sender adopted the receiver as its parent.
    child: bool,
    max_leaf_distance: u32,
    leaf: ModuleId,
}

struct LeaderMsg {
    leader: ModuleId,
}

/// The gradient control program.
pub struct GradientCode {
    registry: HandlerRegistry<GradientCode>,
    /// Hop distance from the round seed.
    distance: u32,
    round: u32,
    /// Port the spanning-tree parent sits on. The seed has none.
    parent: Option<Direction>,
    /// Ports of modules that adopted us as their parent.
    children: Vec<Direction>,
    /// Acknowledgments still outstanding for our last broadcast.
    pending_acks: usize,
    /// Largest leaf distance seen in our subtree, and whose it is.
    max_leaf_distance: u32,
    candidate_leaf: ModuleId,
    /// Whether this module initiated the current round.
    initiated: bool,
    moved: bool,
}

impl GradientCode {
    pub fn new() -> Self {
        let mut registry = HandlerRegistry::new();
        registry.register(DISTANCE_MSG, GradientCode::handle_distance);
        registry.register(ACK_MSG, GradientCode::handle_ack);
        registry.register(LEADER_MSG, GradientCode::handle_leader);
        GradientCode {
            registry,
            distance: 0,
            round: 0,
            parent: None,
            children: Vec::new(),
            pending_acks: 0,
            max_leaf_distance: 0,
            candidate_leaf: ModuleId(0),
            initiated: false,
            moved: false,
        }
    }

    fn distance_message(&self) -> Message {
        Message::new(
            DISTANCE_MSG,
            DistanceMsg {
                distance: self.distance,
                round: self.round,
            },
        )
    }

    fn ack_message(&self, child: bool) -> Message {
        Message::new(
            ACK_MSG,
            AckMsg {
                child,
                max_leaf_distance: if child { self.max_leaf_distance } else { 0 },
                leaf: self.candidate_leaf,
            },
        )
    }

    fn record_gradient(&self, ctx: &mut ModuleContext<'_>) {
        ctx.set_attribute("distance", self.distance.to_string());
        ctx.set_attribute("round", self.round.to_string());
    }

    fn handle_distance(&mut self, message: &Message, from: Direction, ctx: &mut ModuleContext<'_>) {
        let Some(msg) = message.body::<DistanceMsg>() else {
            warn!(module = %ctx.id(), "distance message with wrong body");
            return;
        };
        debug!(
            module = %ctx.id(),
            from = %from,
            distance = msg.distance,
            round = msg.round,
            "distance received"
        );

        let adopt = (!self.initiated && self.parent.is_none()) || msg.round > self.round;
        if adopt {
            self.distance = msg.distance + 1;
            self.round = msg.round;
            self.parent = Some(from);
            self.children.clear();
            self.max_leaf_distance = self.distance;
            self.candidate_leaf = ctx.id();
            self.record_gradient(ctx);

            self.pending_acks = ctx.send_to_all_neighbors_except(
                &self.distance_message(),
                LATENCY,
                JITTER,
                Some(from),
            );
            if self.pending_acks == 0 {
                // Leaf of the spanning tree: acknowledge straight away.
                let ack = self.ack_message(true);
                if let Err(e) = ctx.send(ack, from, LATENCY, JITTER) {
                    warn!(module = %ctx.id(), error = %e, "leaf ack failed");
                }
            }
        } else {
            // Already part of this round: tell the sender we are not its
            // child so its pending count drains.
            let ack = self.ack_message(false);
            if let Err(e) = ctx.send(ack, from, LATENCY, JITTER) {
                warn!(module = %ctx.id(), error = %e, "non-child ack failed");
            }
        }
    }

    fn handle_ack(&mut self, message: &Message, from: Direction, ctx: &mut ModuleContext<'_>) {
        let Some(msg) = message.body::<AckMsg>() else {
            warn!(module = %ctx.id(), "ack message with wrong body");
            return;
        };
        if self.pending_acks == 0 {
            warn!(module = %ctx.id(), "unexpected ack");
            return;
        }
        self.pending_acks -= 1;

        if msg.child {
            self.children.push(from);
        }
        if msg.max_leaf_distance > self.max_leaf_distance {
            self.max_leaf_distance = msg.max_leaf_distance;
            self.candidate_leaf = msg.leaf;
        }

        if self.pending_acks > 0 {
            return;
        }
        match self.parent {
            Some(parent) => {
                // Subtree complete: fold the result upward.
                let ack = self.ack_message(true);
                if let Err(e) = ctx.send(ack, parent, LATENCY, JITTER) {
                    warn!(module = %ctx.id(), error = %e, "upward ack failed");
                }
            }
            None => {
                // Root: the farthest leaf wins the election.
                let leader = self.candidate_leaf;
                info!(
                    root = %ctx.id(),
                    leader = %leader,
                    distance = self.max_leaf_distance,
                    "leader elected"
                );
                if leader == ctx.id() {
                    self.become_leader(ctx);
                } else {
                    self.announce_leader(leader, ctx);
                }
            }
        }
    }

    fn handle_leader(&mut self, message: &Message, _from: Direction, ctx: &mut ModuleContext<'_>) {
        let Some(msg) = message.body::<LeaderMsg>() else {
            warn!(module = %ctx.id(), "leader message with wrong body");
            return;
        };
        if msg.leader == ctx.id() {
            if !self.moved {
                self.become_leader(ctx);
            }
        } else {
            self.announce_leader(msg.leader, ctx);
        }
    }

    fn announce_leader(&mut self, leader: ModuleId, ctx: &mut ModuleContext<'_>) {
        for &child in &self.children {
            let msg = Message::new(LEADER_MSG, LeaderMsg { leader });
            if let Err(e) = ctx.send(msg, child, LATENCY, JITTER) {
                warn!(module = %ctx.id(), error = %e, "leader forward failed");
            }
        }
    }

    /// The elected module performs one motion into a free neighboring cell.
    fn become_leader(&mut self, ctx: &mut ModuleContext<'_>) {
        self.moved = true;
        ctx.set_attribute("leader", "true");
        match ctx.free_neighbor_cells().into_iter().next() {
            Some((port, cell)) => {
                info!(leader = %ctx.id(), destination = %cell, via = %port, "leader moving");
                ctx.start_motion(cell, Orientation(0));
            }
            None => {
                info!(leader = %ctx.id(), "leader has no free cell to move into");
                ctx.set_attribute("stuck", "true");
            }
        }
    }
}

impl Default for GradientCode {
    fn default() -> Self {
        GradientCode::new()
    }
}

impl ModuleCode for GradientCode {
    fn on_startup(&mut self, ctx: &mut ModuleContext<'_>) {
        self.candidate_leaf = ctx.id();
        if ctx.state().attribute("seed") != Some("true") {
            return;
        }

        self.initiated = true;
        self.distance = 0;
        self.round = 1;
        self.record_gradient(ctx);
        info!(seed = %ctx.id(), "starting gradient round");

        self.pending_acks = ctx.send_to_all_neighbors(&self.distance_message(), LATENCY, JITTER);
        if self.pending_acks == 0 {
            // Alone on the lattice: the seed is trivially the leader.
            self.become_leader(ctx);
        }
    }

    fn on_message(&mut self, message: &Message, from: Direction, ctx: &mut ModuleContext<'_>) {
        let registry = mem::take(&mut self.registry);
        if !registry.dispatch(self, message, from, ctx) {
            warn!(module = %ctx.id(), kind = ?message.kind(), "no handler registered");
        }
        self.registry = registry;
    }

    fn on_motion_end(&mut self, ctx: &mut ModuleContext<'_>) {
        ctx.set_attribute("moved", "true");
        info!(module = %ctx.id(), cell = %ctx.state().cell(), "leader motion complete");
    }
}
