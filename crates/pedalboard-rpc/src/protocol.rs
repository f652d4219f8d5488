//! Wire protocol between the control and processing contexts.
//!
//! The method set is a closed enum: dispatch is an explicit `match`,
//! never reflection over method names, so an unknown method cannot
//! exist past deserialization.

use pedalboard_core::chain::SlotId;
use pedalboard_core::params::IndexEntry;
use serde::{Deserialize, Serialize};

/// Methods one side may invoke on the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Ping,
    /// Replace the mirrored slot order.
    UpdateChain { order: Vec<SlotId> },
    /// Replace the mirrored public parameter table.
    UpdateParameterIndex { entries: Vec<IndexEntry> },
    /// Replace the mirrored total chain latency.
    SetCompensationDelay { samples: u64 },
    GetCompensationDelay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Ack,
    CompensationDelay { samples: u64 },
}

/// One message on the port. A reply carries exactly one of
/// `value`/`error`; build them through [`Frame::ok`] and [`Frame::err`]
/// to keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Call {
        call_id: u64,
        request: Request,
    },
    Reply {
        call_id: u64,
        value: Option<Response>,
        error: Option<String>,
    },
}

impl Frame {
    pub fn ok(call_id: u64, value: Response) -> Self {
        Self::Reply {
            call_id,
            value: Some(value),
            error: None,
        }
    }

    pub fn err(call_id: u64, message: impl Into<String>) -> Self {
        Self::Reply {
            call_id,
            value: None,
            error: Some(message.into()),
        }
    }
}

// ============ Tests ============
