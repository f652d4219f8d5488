//! Plugin capability interface.
//!
//! The chain store never talks to a concrete plugin format. Everything
//! it needs from a loaded plugin is expressed here as object-safe
//! traits, so hosts can back slots with whatever runtime they have
//! (in-process DSP, sandboxed workers, remote engines).

use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Identity of any connectable endpoint: a plugin node, the chain's
/// input/output boundary, or an external event destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

/// Descriptive metadata for one plugin parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Identifier the owner addresses the parameter by.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    pub units: String,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
}

impl ParameterInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            units: String::new(),
            min_value: 0.0,
            max_value: 1.0,
            default_value: 0.0,
        }
    }
}

/// A parameter value, in plugin-native units or normalized to 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    pub value: f64,
    pub normalized: bool,
}

/// An event delivered to a single plugin, keyed by its native
/// parameter ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeEvent {
    Automation {
        param_id: String,
        value: f64,
        normalized: bool,
        /// Absolute time in seconds, or `None` for "now".
        time: Option<f64>,
    },
    Midi {
        bytes: [u8; 3],
        time: Option<f64>,
    },
}

/// Anything the signal graph can wire together.
///
/// Implementations connect themselves to a downstream endpoint and tear
/// down their own outgoing edges. The routers drive these primitives
/// from the computed edge set; they never assume a call succeeds.
pub trait ChainEndpoint: Send + Sync {
    fn instance_id(&self) -> InstanceId;

    /// Create a signal edge from this endpoint to `next`.
    fn connect(&self, next: &dyn ChainEndpoint) -> Result<(), NodeError>;

    /// Drop all outgoing signal edges from this endpoint.
    fn disconnect(&self) -> Result<(), NodeError>;
}

/// Capability interface every chained plugin must provide.
pub trait PluginNode: ChainEndpoint {
    fn name(&self) -> &str;

    /// Create an event edge from this plugin to `to`, optionally from a
    /// specific event output.
    fn connect_events(&self, to: InstanceId, output: Option<usize>) -> Result<(), NodeError>;

    /// Drop event edges. `to: None` drops every outgoing event edge.
    fn disconnect_events(&self, to: Option<InstanceId>, output: Option<usize>)
        -> Result<(), NodeError>;

    /// Parameters in the plugin's own enumeration order. That order is
    /// what the public parameter index is built from.
    fn parameter_list(&self) -> Result<Vec<ParameterInfo>, NodeError>;

    fn parameter_info(&self, ids: &[String]) -> Result<HashMap<String, ParameterInfo>, NodeError>;

    fn parameter_values(
        &self,
        normalized: bool,
        ids: &[String],
    ) -> Result<HashMap<String, ParameterValue>, NodeError>;

    fn set_parameter_values(
        &self,
        values: &HashMap<String, ParameterValue>,
    ) -> Result<(), NodeError>;

    /// Opaque serialized state, restorable via [`set_state`](Self::set_state).
    fn get_state(&self) -> Result<Vec<u8>, NodeError>;

    fn set_state(&self, data: &[u8]) -> Result<(), NodeError>;

    /// Latency introduced by this plugin, in samples.
    fn compensation_delay(&self) -> Result<u64, NodeError>;

    fn schedule_events(&self, events: &[NodeEvent]) -> Result<(), NodeError>;

    fn clear_events(&self) -> Result<(), NodeError>;

    /// Release the plugin's resources. Called after the node has left
    /// the chain and its edges are gone.
    fn destroy(&self);
}

/// Resolves a source locator (URL, path, registry key) to a running
/// plugin instance.
pub trait PluginLoader: Send + Sync {
    fn load(&self, locator: &str) -> Result<Arc<dyn PluginNode>, NodeError>;
}
