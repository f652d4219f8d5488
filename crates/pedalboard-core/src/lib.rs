//! Chain store, graph rewiring, and parameter virtualization for the
//! pedalboard plugin host.
//!
//! The pieces compose bottom-up:
//!
//! - [`node`] — capability traits a host implements per plugin format
//! - [`routing`] — recompute-and-diff rewiring of the signal and event
//!   graphs
//! - [`params`] — one flat public parameter index over every chained
//!   plugin
//! - [`chain`] — the store tying slots, routers, index, and change
//!   notifications together

pub mod chain;
pub mod error;
pub mod node;
pub mod params;
pub mod routing;

pub use chain::{ChainChanged, ChainEvent, ChainState, ChainStore, PluginSlot, SavedSlot, SlotId};
pub use error::{ChainError, NodeError, Result};
pub use node::{
    ChainEndpoint, InstanceId, NodeEvent, ParameterInfo, ParameterValue, PluginLoader, PluginNode,
};
pub use params::{AutomationEvent, IndexEntry, ParameterIndex};
pub use routing::{Edge, EventRouter, SignalRouter};
