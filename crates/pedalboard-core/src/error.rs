//! Error types for pedalboard-core.

use crate::chain::SlotId;
use thiserror::Error;

/// Failure reported by a plugin capability primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("state error: {0}")]
    State(String),

    #[error("plugin error: {0}")]
    Plugin(String),
}

/// Errors from chain store operations.
///
/// Nothing here is fatal. Every variant leaves the chain exactly as it
/// was before the failing operation.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("plugin load failed: {locator}\n  Reason: {reason}")]
    Load { locator: String, reason: String },

    #[error("no {0} in chain")]
    NotFound(SlotId),

    #[error("reorder position out of range: {from} -> {to} (chain length {len})")]
    OutOfRange { from: usize, to: usize, len: usize },

    #[error("state capture failed for {locator}: {source}")]
    State { locator: String, source: NodeError },
}

pub type Result<T> = std::result::Result<T, ChainError>;
