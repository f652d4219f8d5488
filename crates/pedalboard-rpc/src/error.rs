//! Error types for the RPC bridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    /// The bridge was torn down. Outstanding calls settle with this
    /// instead of hanging forever.
    #[error("rpc bridge closed")]
    Closed,

    /// The peer reported a failure while handling the call.
    #[error("peer error: {0}")]
    Peer(String),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, RpcError>;
