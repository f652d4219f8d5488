//! Ordered plugin chain presented as one unit.
//!
//! [`ChainStore`] owns the slot list and drives everything that hangs
//! off it: signal rewiring, event rewiring, and the public parameter
//! index. Every topology mutation ends with the graph, the table, and
//! the subscribers consistent with the new order, or with the chain
//! untouched when the mutation fails.
//!
//! The store itself is not a lock; hosts that mutate from multiple
//! threads wrap it in one (`RwLock<ChainStore>` or similar) and keep
//! mutations serialized.

use crate::error::{ChainError, Result};
use crate::node::{
    ChainEndpoint, InstanceId, NodeEvent, ParameterInfo, ParameterValue, PluginLoader, PluginNode,
};
use crate::params::{AutomationEvent, ParameterIndex};
use crate::routing::{Edge, EventRouter, SignalRouter};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stable identity of one chain occupant. Allocated monotonically by
/// the owning store and never reused, not even across `clear`, so a
/// stale handle can never alias a newer plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// One loaded plugin occupying one chain position.
pub struct PluginSlot {
    pub id: SlotId,
    /// Locator the plugin was loaded from; persisted verbatim.
    pub locator: String,
    pub node: Arc<dyn PluginNode>,
}

/// Emitted once per completed topology mutation. Public parameter
/// indices handed out before this fired are no longer meaningful.
#[derive(Debug, Clone)]
pub struct ChainChanged {
    pub order: Vec<SlotId>,
}

/// An event scheduled against the aggregate chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    /// Automation addressed by public parameter index; routed to the
    /// owning plugin.
    Automation(AutomationEvent),
    /// Forwarded to the first slot, which relays down the event path.
    Midi { bytes: [u8; 3], time: Option<f64> },
}

/// Persisted form of one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSlot {
    pub url: String,
    pub params: Vec<u8>,
}

/// Persisted form of the whole chain: ordered, free of slot ids and
/// instance ids, restorable on a fresh store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainState {
    pub slots: Vec<SavedSlot>,
}

/// The chain itself: slot list, routers, parameter index, subscribers.
pub struct ChainStore {
    slots: Vec<PluginSlot>,
    loader: Arc<dyn PluginLoader>,
    input: Arc<dyn ChainEndpoint>,
    output: Arc<dyn ChainEndpoint>,
    event_dest: InstanceId,
    signal: SignalRouter,
    events: EventRouter,
    params: ParameterIndex,
    next_slot: u64,
    subscribers: Vec<Sender<ChainChanged>>,
}

impl ChainStore {
    /// A fresh, empty chain. The input boundary is wired straight to
    /// the output boundary until the first plugin arrives.
    pub fn new(
        loader: Arc<dyn PluginLoader>,
        input: Arc<dyn ChainEndpoint>,
        output: Arc<dyn ChainEndpoint>,
        event_dest: InstanceId,
    ) -> Self {
        let mut store = Self {
            slots: Vec::new(),
            loader,
            input,
            output,
            event_dest,
            signal: SignalRouter::new(),
            events: EventRouter::new(),
            params: ParameterIndex::new(),
            next_slot: 0,
            subscribers: Vec::new(),
        };
        store.rewire();
        store
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[PluginSlot] {
        &self.slots
    }

    /// Current slot order, input side first.
    pub fn order(&self) -> Vec<SlotId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    pub fn param_index(&self) -> &ParameterIndex {
        &self.params
    }

    /// Signal edges applied by the last rewiring pass.
    pub fn signal_edges(&self) -> &[Edge] {
        self.signal.edges()
    }

    /// Event edges applied by the last rewiring pass.
    pub fn event_edges(&self) -> &[Edge] {
        self.events.edges()
    }

    /// Receive one [`ChainChanged`] per completed topology mutation.
    pub fn subscribe(&mut self) -> Receiver<ChainChanged> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Load a plugin and append it at the output end of the chain.
    ///
    /// `initial_state` is applied before the plugin joins the graph; if
    /// the plugin rejects it, the load fails and the chain is unchanged.
    pub fn add_plugin(&mut self, locator: &str, initial_state: Option<&[u8]>) -> Result<SlotId> {
        let node = self.loader.load(locator).map_err(|e| ChainError::Load {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(state) = initial_state {
            if let Err(e) = node.set_state(state) {
                node.destroy();
                return Err(ChainError::Load {
                    locator: locator.to_string(),
                    reason: format!("initial state rejected: {e}"),
                });
            }
        }

        let id = SlotId(self.next_slot);
        self.next_slot += 1;
        self.slots.push(PluginSlot {
            id,
            locator: locator.to_string(),
            node,
        });
        info!(slot = %id, locator, "plugin added");

        self.rewire();
        self.params.rebuild(&self.slots);
        self.notify();
        Ok(id)
    }

    /// Remove one slot and close the gap around it.
    pub fn remove_plugin(&mut self, id: SlotId) -> Result<()> {
        let pos = self
            .slots
            .iter()
            .position(|s| s.id == id)
            .ok_or(ChainError::NotFound(id))?;
        let removed = self.slots.remove(pos);

        // Tear the node's own edges down while we still hold it; the
        // routers only resolve endpoints still in the chain.
        if let Err(e) = removed.node.disconnect() {
            warn!(slot = %id, error = %e, "signal disconnect of removed slot failed");
        }
        if let Err(e) = removed.node.disconnect_events(None, None) {
            warn!(slot = %id, error = %e, "event disconnect of removed slot failed");
        }

        self.rewire();
        self.params.rebuild(&self.slots);
        removed.node.destroy();
        info!(slot = %id, "plugin removed");
        self.notify();
        Ok(())
    }

    /// Move the slot at position `from` to position `to`, shifting the
    /// slots in between. Positions index the current order.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.slots.len();
        if from >= len || to >= len {
            return Err(ChainError::OutOfRange { from, to, len });
        }
        if from == to {
            return Ok(());
        }

        let slot = self.slots.remove(from);
        self.slots.insert(to, slot);

        self.rewire();
        self.params.rebuild(&self.slots);
        self.notify();
        Ok(())
    }

    /// Remove every plugin. Always emits a change notification, even on
    /// an already-empty chain, so downstream caches converge without
    /// tracking whether anything was present.
    pub fn clear(&mut self) {
        let removed: Vec<PluginSlot> = self.slots.drain(..).collect();
        for slot in &removed {
            if let Err(e) = slot.node.disconnect() {
                warn!(slot = %slot.id, error = %e, "signal disconnect failed during clear");
            }
            if let Err(e) = slot.node.disconnect_events(None, None) {
                warn!(slot = %slot.id, error = %e, "event disconnect failed during clear");
            }
        }

        self.rewire();
        self.params.rebuild(&self.slots);
        for slot in removed {
            slot.node.destroy();
        }
        self.notify();
    }

    /// Capture the chain as an ordered list of (locator, plugin state)
    /// pairs. Fails if any plugin refuses to serialize.
    pub fn get_state(&self) -> Result<ChainState> {
        let mut slots = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let params = slot.node.get_state().map_err(|e| ChainError::State {
                locator: slot.locator.clone(),
                source: e,
            })?;
            slots.push(SavedSlot {
                url: slot.locator.clone(),
                params,
            });
        }
        Ok(ChainState { slots })
    }

    /// Replace the whole chain with a previously captured state.
    /// Plugins are loaded sequentially in saved order; the first load
    /// failure aborts with the chain holding the slots restored so far.
    pub fn set_state(&mut self, state: &ChainState) -> Result<()> {
        self.clear();
        for saved in &state.slots {
            self.add_plugin(&saved.url, Some(&saved.params))?;
        }
        Ok(())
    }

    /// Total latency of the chain in samples. A plugin that cannot
    /// report counts as zero rather than failing the sum.
    pub fn compensation_delay(&self) -> u64 {
        self.slots
            .iter()
            .map(|slot| {
                slot.node.compensation_delay().unwrap_or_else(|e| {
                    warn!(slot = %slot.id, error = %e, "compensation delay query failed");
                    0
                })
            })
            .sum()
    }

    /// Schedule events against the aggregate. Automation events are
    /// routed to their owning plugin via the public parameter index;
    /// everything else enters at the first slot and relays down the
    /// event path.
    pub fn schedule_events(&self, events: &[ChainEvent]) {
        let mut passthrough: SmallVec<[NodeEvent; 8]> = SmallVec::new();
        for event in events {
            match event {
                ChainEvent::Automation(auto) => {
                    if !self.params.route_automation(&self.slots, auto) {
                        debug!(index = auto.index, "automation event not delivered");
                    }
                }
                ChainEvent::Midi { bytes, time } => passthrough.push(NodeEvent::Midi {
                    bytes: *bytes,
                    time: *time,
                }),
            }
        }
        if passthrough.is_empty() {
            return;
        }
        if let Some(first) = self.slots.first() {
            if let Err(e) = first.node.schedule_events(&passthrough) {
                warn!(slot = %first.id, error = %e, "event forwarding failed");
            }
        }
    }

    /// Route one automation event to the plugin owning the public
    /// index. Returns whether it was delivered.
    pub fn route_automation(&self, event: &AutomationEvent) -> bool {
        self.params.route_automation(&self.slots, event)
    }

    /// Drop pending scheduled events on every plugin.
    pub fn clear_events(&self) {
        for slot in &self.slots {
            if let Err(e) = slot.node.clear_events() {
                warn!(slot = %slot.id, error = %e, "clearing events failed");
            }
        }
    }

    /// Attach an external listener to the chain's event output: events
    /// leaving the last slot also reach `to`. No-op on an empty chain.
    pub fn connect_events(&self, to: InstanceId, output: Option<usize>) {
        if let Some(last) = self.slots.last() {
            if let Err(e) = last.node.connect_events(to, output) {
                warn!(slot = %last.id, error = %e, "event listener attach failed");
            }
        }
    }

    /// Detach an external event listener from the last slot.
    pub fn disconnect_events(&self, to: Option<InstanceId>, output: Option<usize>) {
        if let Some(last) = self.slots.last() {
            if let Err(e) = last.node.disconnect_events(to, output) {
                warn!(slot = %last.id, error = %e, "event listener detach failed");
            }
        }
    }

    /// Metadata for public parameter indices; empty means all.
    pub fn parameter_info(&self, indices: &[usize]) -> HashMap<usize, ParameterInfo> {
        self.params.parameter_info(&self.slots, indices)
    }

    /// Values for public parameter indices.
    pub fn parameter_values(
        &self,
        normalized: bool,
        indices: &[usize],
    ) -> HashMap<usize, ParameterValue> {
        self.params.parameter_values(&self.slots, normalized, indices)
    }

    /// Write values keyed by public parameter index.
    pub fn set_parameter_values(&self, values: &HashMap<usize, ParameterValue>) {
        self.params.set_parameter_values(&self.slots, values)
    }

    fn rewire(&mut self) {
        self.signal
            .rewire(self.input.as_ref(), self.output.as_ref(), &self.slots);
        self.events.rewire(self.event_dest, &self.slots);
    }

    fn notify(&mut self) {
        let change = ChainChanged { order: self.order() };
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

// ============ Tests ============
