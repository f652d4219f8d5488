//! # Pedalboard
//!
//! A dynamic chain of audio plugins presented as one unit: an ordered
//! slot list with automatic signal and event rewiring, one flat public
//! parameter index over every chained plugin, and an RPC bridge that
//! keeps a lock-free mirror of the topology on the processing side.
//!
//! This crate is an umbrella over the workspace members:
//!
//! - [`pedalboard_core`] (re-exported as [`core`]) — chain store,
//!   routers, parameter index, capability traits
//! - [`pedalboard_rpc`] (re-exported as [`rpc`]) — wire protocol,
//!   call/response endpoints, processing-side mirror, sync driver
//!
//! ## Quick start
//!
//! ```ignore
//! use pedalboard::{ChainStore, InstanceId};
//! use std::sync::Arc;
//!
//! // `loader`, `input`, and `output` come from your plugin host.
//! let mut chain = ChainStore::new(loader, input, output, InstanceId(2));
//!
//! let fuzz = chain.add_plugin("https://plugins.example/fuzz", None)?;
//! chain.add_plugin("https://plugins.example/delay", None)?;
//!
//! // One flat parameter space over both plugins.
//! let infos = chain.parameter_info(&[]);
//!
//! // Persist and restore the whole chain.
//! let saved = chain.get_state()?;
//! chain.set_state(&saved)?;
//! # Ok::<(), pedalboard::ChainError>(())
//! ```

pub use pedalboard_core as core;
pub use pedalboard_rpc as rpc;

pub use pedalboard_core::{
    AutomationEvent, ChainChanged, ChainEndpoint, ChainError, ChainEvent, ChainState, ChainStore,
    EventRouter, IndexEntry, InstanceId, NodeError, NodeEvent, ParameterIndex, ParameterInfo,
    ParameterValue, PluginLoader, PluginNode, PluginSlot, SavedSlot, SignalRouter, SlotId,
};
pub use pedalboard_rpc::{
    ChainSnapshot, ChainSync, Frame, MessagePort, MirrorHandler, OutboundOnly, ProcessorMirror,
    Request, Response, RpcEndpoint, RpcError, RpcHandler,
};
