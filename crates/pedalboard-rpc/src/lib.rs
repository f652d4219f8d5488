//! RPC bridge between the pedalboard's control and processing
//! contexts.
//!
//! The two contexts share nothing but a message port. The control side
//! owns the chain store; the processing side keeps a lock-free mirror
//! of whatever the store last pushed:
//!
//! - [`protocol`] — closed-enum wire frames
//! - [`port`] — the discrete-message boundary
//! - [`endpoint`] — call/response with an id-correlated pending table
//! - [`mirror`] — the processing-side snapshot
//! - [`sync`] — the driver pushing store changes to the mirror

pub mod endpoint;
pub mod error;
pub mod mirror;
pub mod port;
pub mod protocol;
pub mod sync;

pub use endpoint::{OutboundOnly, RpcEndpoint, RpcHandler};
pub use error::{Result, RpcError};
pub use mirror::{ChainSnapshot, MirrorHandler, ProcessorMirror};
pub use port::MessagePort;
pub use protocol::{Frame, Request, Response};
pub use sync::ChainSync;
