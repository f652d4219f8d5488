//! Parameter index virtualization.
//!
//! Every plugin owns its own parameter namespace. The chain presents
//! one flat, dense public index over all of them: position in the table
//! is the public index, and each row records which slot owns the
//! parameter and what the plugin calls it. The table is rebuilt from
//! scratch after every topology mutation, so public indices are only
//! stable between mutations.

use crate::chain::{PluginSlot, SlotId};
use crate::node::{NodeEvent, ParameterInfo, ParameterValue, PluginNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Automation event addressed to the chain's public parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationEvent {
    pub index: usize,
    pub value: f64,
    pub normalized: bool,
    pub time: Option<f64>,
}

/// One row of the public parameter table. The row's position in the
/// table is its public index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub slot: SlotId,
    pub param_id: String,
}

/// Flat public index over every chained plugin's parameters.
#[derive(Debug, Default)]
pub struct ParameterIndex {
    entries: Vec<IndexEntry>,
}

impl ParameterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn resolve(&self, index: usize) -> Option<&IndexEntry> {
        self.entries.get(index)
    }

    /// Rebuild the table from scratch: chain order first, then each
    /// plugin's own enumeration order. A plugin whose enumeration fails
    /// contributes no entries, keeping the table dense.
    pub fn rebuild(&mut self, slots: &[PluginSlot]) {
        self.entries.clear();
        for slot in slots {
            match slot.node.parameter_list() {
                Ok(params) => self.entries.extend(params.into_iter().map(|p| IndexEntry {
                    slot: slot.id,
                    param_id: p.id,
                })),
                Err(e) => {
                    warn!(slot = %slot.id, error = %e, "parameter enumeration failed, slot contributes no entries")
                }
            }
        }
    }

    /// Metadata for the requested public indices, relabeled so the ids
    /// are public indices and names carry the owning plugin's name.
    /// Empty `indices` means the whole table. Indices outside the table
    /// are silently omitted.
    pub fn parameter_info(
        &self,
        slots: &[PluginSlot],
        indices: &[usize],
    ) -> HashMap<usize, ParameterInfo> {
        let mut out = HashMap::new();
        for (slot_id, group) in self.grouped(indices) {
            let Some(node) = find_node(slots, slot_id) else {
                continue;
            };
            let ids: Vec<String> = group.iter().map(|(_, id)| id.clone()).collect();
            let infos = match node.parameter_info(&ids) {
                Ok(infos) => infos,
                Err(e) => {
                    warn!(slot = %slot_id, error = %e, "parameter info query failed");
                    continue;
                }
            };
            for (public, param_id) in group {
                if let Some(info) = infos.get(&param_id) {
                    let mut info = info.clone();
                    info.name = format!("{}/{}", node.name(), info.name);
                    info.id = public.to_string();
                    out.insert(public, info);
                }
            }
        }
        out
    }

    /// Current values for the requested public indices, one round trip
    /// per distinct owning plugin.
    pub fn parameter_values(
        &self,
        slots: &[PluginSlot],
        normalized: bool,
        indices: &[usize],
    ) -> HashMap<usize, ParameterValue> {
        if indices.is_empty() {
            return HashMap::new();
        }
        let mut out = HashMap::new();
        for (slot_id, group) in self.grouped(indices) {
            let Some(node) = find_node(slots, slot_id) else {
                continue;
            };
            let ids: Vec<String> = group.iter().map(|(_, id)| id.clone()).collect();
            match node.parameter_values(normalized, &ids) {
                Ok(values) => {
                    for (public, param_id) in group {
                        if let Some(value) = values.get(&param_id) {
                            out.insert(public, *value);
                        }
                    }
                }
                Err(e) => warn!(slot = %slot_id, error = %e, "parameter value query failed"),
            }
        }
        out
    }

    /// Write values keyed by public index, one call per owning plugin.
    /// Stale indices and indices whose owner left the chain are no-ops.
    pub fn set_parameter_values(
        &self,
        slots: &[PluginSlot],
        values: &HashMap<usize, ParameterValue>,
    ) {
        let mut per_slot: HashMap<SlotId, HashMap<String, ParameterValue>> = HashMap::new();
        for (&public, &value) in values {
            let Some(entry) = self.resolve(public) else {
                continue;
            };
            per_slot
                .entry(entry.slot)
                .or_default()
                .insert(entry.param_id.clone(), value);
        }
        for (slot_id, writes) in per_slot {
            let Some(node) = find_node(slots, slot_id) else {
                continue;
            };
            if let Err(e) = node.set_parameter_values(&writes) {
                warn!(slot = %slot_id, error = %e, "parameter write failed");
            }
        }
    }

    /// Deliver one automation event to the owning plugin, re-keyed to
    /// its native parameter id. Returns whether the event was accepted;
    /// a stale index is a quiet `false`, not an error.
    pub fn route_automation(&self, slots: &[PluginSlot], event: &AutomationEvent) -> bool {
        let Some(entry) = self.resolve(event.index) else {
            return false;
        };
        let Some(node) = find_node(slots, entry.slot) else {
            return false;
        };
        let rekeyed = NodeEvent::Automation {
            param_id: entry.param_id.clone(),
            value: event.value,
            normalized: event.normalized,
            time: event.time,
        };
        match node.schedule_events(std::slice::from_ref(&rekeyed)) {
            Ok(()) => true,
            Err(e) => {
                warn!(slot = %entry.slot, error = %e, "automation delivery failed");
                false
            }
        }
    }

    /// Group public indices by owning slot, preserving request order
    /// within each group. Empty input expands to the whole table.
    fn grouped(&self, indices: &[usize]) -> HashMap<SlotId, Vec<(usize, String)>> {
        let mut groups: HashMap<SlotId, Vec<(usize, String)>> = HashMap::new();
        let mut push = |public: usize, entry: &IndexEntry| {
            groups
                .entry(entry.slot)
                .or_default()
                .push((public, entry.param_id.clone()));
        };
        if indices.is_empty() {
            for (public, entry) in self.entries.iter().enumerate() {
                push(public, entry);
            }
        } else {
            for &public in indices {
                if let Some(entry) = self.entries.get(public) {
                    push(public, entry);
                }
            }
        }
        groups
    }
}

fn find_node<'a>(slots: &'a [PluginSlot], id: SlotId) -> Option<&'a dyn PluginNode> {
    slots.iter().find(|s| s.id == id).map(|s| s.node.as_ref())
}

// ============ Tests ============
