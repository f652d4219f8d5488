//! Signal and event graph rewiring.
//!
//! Both routers work the same way: compute the full target edge set
//! from the current chain order, diff it against the edges applied last
//! time, and drive only the difference through the endpoint primitives.
//! There are no per-mutation special cases; insert, remove, and reorder
//! all reduce to one recompute-and-diff pass.
//!
//! Rewiring is best-effort. A failing connect or disconnect primitive
//! is logged and skipped, and the remaining edges are still driven, so
//! one misbehaving plugin cannot wedge the rest of the graph.

use crate::chain::PluginSlot;
use crate::node::{ChainEndpoint, InstanceId, PluginNode};
use tracing::{debug, warn};

/// A directed edge between two endpoints.
pub type Edge = (InstanceId, InstanceId);

fn slot_ids(slots: &[PluginSlot]) -> Vec<InstanceId> {
    slots.iter().map(|s| s.node.instance_id()).collect()
}

fn find_node<'a>(id: InstanceId, slots: &'a [PluginSlot]) -> Option<&'a dyn PluginNode> {
    slots
        .iter()
        .find(|s| s.node.instance_id() == id)
        .map(|s| s.node.as_ref())
}

/// Rewires the audio path `input -> slot_0 -> ... -> slot_n-1 -> output`.
#[derive(Debug, Default)]
pub struct SignalRouter {
    applied: Vec<Edge>,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target signal edge set for the given order. An empty chain still
    /// has one edge: input direct to output.
    pub fn desired_edges(input: InstanceId, output: InstanceId, order: &[InstanceId]) -> Vec<Edge> {
        let mut edges = Vec::with_capacity(order.len() + 1);
        let mut prev = input;
        for &id in order {
            edges.push((prev, id));
            prev = id;
        }
        edges.push((prev, output));
        edges
    }

    /// Edges applied by the last `rewire` call.
    pub fn edges(&self) -> &[Edge] {
        &self.applied
    }

    /// Reconcile the live graph with the target edge set for `slots`.
    pub fn rewire(
        &mut self,
        input: &dyn ChainEndpoint,
        output: &dyn ChainEndpoint,
        slots: &[PluginSlot],
    ) {
        let desired =
            Self::desired_edges(input.instance_id(), output.instance_id(), &slot_ids(slots));

        // Each source has exactly one outgoing signal edge, so a stale
        // edge means that source's successor changed: drop its output.
        for edge @ (from, _) in &self.applied {
            if desired.contains(edge) {
                continue;
            }
            match resolve(*from, input, slots) {
                Some(endpoint) => {
                    if let Err(e) = endpoint.disconnect() {
                        warn!(from = from.0, error = %e, "signal disconnect failed");
                    }
                }
                // Source already left the chain; the store disconnects
                // removed nodes before they are dropped.
                None => debug!(from = from.0, "stale signal edge source no longer present"),
            }
        }

        for edge @ (from, to) in &desired {
            if self.applied.contains(edge) {
                continue;
            }
            let source = resolve(*from, input, slots);
            let target = resolve(*to, output, slots);
            match (source, target) {
                (Some(src), Some(dst)) => {
                    if let Err(e) = src.connect(dst) {
                        warn!(from = from.0, to = to.0, error = %e, "signal connect failed");
                    }
                }
                _ => warn!(from = from.0, to = to.0, "signal edge endpoints unresolved"),
            }
        }

        self.applied = desired;
    }
}

fn resolve<'a>(
    id: InstanceId,
    boundary: &'a dyn ChainEndpoint,
    slots: &'a [PluginSlot],
) -> Option<&'a dyn ChainEndpoint> {
    if boundary.instance_id() == id {
        return Some(boundary);
    }
    find_node(id, slots).map(|node| -> &dyn ChainEndpoint { node })
}

/// Rewires the event forwarding path `slot_0 -> ... -> slot_n-1 -> dest`.
///
/// Kept separate from [`SignalRouter`] because the two graphs use
/// different primitives and fail independently, but both are always
/// driven from the same slot order.
#[derive(Debug, Default)]
pub struct EventRouter {
    applied: Vec<Edge>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target event edge set: each slot forwards to its successor and
    /// the last slot forwards to the external destination. An empty
    /// chain forwards nothing.
    pub fn desired_edges(event_dest: InstanceId, order: &[InstanceId]) -> Vec<Edge> {
        let mut edges = Vec::with_capacity(order.len());
        for pair in order.windows(2) {
            edges.push((pair[0], pair[1]));
        }
        if let Some(&last) = order.last() {
            edges.push((last, event_dest));
        }
        edges
    }

    pub fn edges(&self) -> &[Edge] {
        &self.applied
    }

    pub fn rewire(&mut self, event_dest: InstanceId, slots: &[PluginSlot]) {
        let desired = Self::desired_edges(event_dest, &slot_ids(slots));

        for edge @ (from, to) in &self.applied {
            if desired.contains(edge) {
                continue;
            }
            match find_node(*from, slots) {
                Some(node) => {
                    if let Err(e) = node.disconnect_events(Some(*to), None) {
                        warn!(from = from.0, to = to.0, error = %e, "event disconnect failed");
                    }
                }
                None => debug!(from = from.0, "stale event edge source no longer present"),
            }
        }

        for edge @ (from, to) in &desired {
            if self.applied.contains(edge) {
                continue;
            }
            match find_node(*from, slots) {
                Some(node) => {
                    if let Err(e) = node.connect_events(*to, None) {
                        warn!(from = from.0, to = to.0, error = %e, "event connect failed");
                    }
                }
                None => warn!(from = from.0, to = to.0, "event edge source unresolved"),
            }
        }

        self.applied = desired;
    }
}

// ============ Tests ============
