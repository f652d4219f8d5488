//! Processing-side mirror of the chain topology.
//!
//! The real-time context must never block on the control context, so it
//! keeps a read-mostly snapshot of the slot order, the public parameter
//! table, and the total latency. Updates arrive as pushed RPC calls and
//! swap the whole snapshot atomically; readers load it lock-free on
//! every query.

use crate::endpoint::RpcHandler;
use crate::protocol::{Request, Response};
use arc_swap::ArcSwap;
use pedalboard_core::chain::SlotId;
use pedalboard_core::params::IndexEntry;
use std::sync::Arc;

/// Everything the processing side knows about the chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainSnapshot {
    pub order: Vec<SlotId>,
    pub entries: Vec<IndexEntry>,
    pub compensation_delay: u64,
}

/// Read handle for the processing context.
pub struct ProcessorMirror {
    snapshot: Arc<ArcSwap<ChainSnapshot>>,
}

impl ProcessorMirror {
    /// A fresh (empty) mirror plus the handler that keeps it current.
    /// Hand the handler to the processing-side
    /// [`RpcEndpoint`](crate::endpoint::RpcEndpoint).
    pub fn new() -> (Self, MirrorHandler) {
        let snapshot = Arc::new(ArcSwap::from_pointee(ChainSnapshot::default()));
        (
            Self {
                snapshot: Arc::clone(&snapshot),
            },
            MirrorHandler { snapshot },
        )
    }

    /// Lock-free load of the current snapshot.
    pub fn snapshot(&self) -> Arc<ChainSnapshot> {
        self.snapshot.load_full()
    }

    /// Resolve a public parameter index against the mirrored table.
    pub fn resolve(&self, index: usize) -> Option<IndexEntry> {
        self.snapshot.load().entries.get(index).cloned()
    }

    pub fn compensation_delay(&self) -> u64 {
        self.snapshot.load().compensation_delay
    }
}

/// Applies pushed topology updates to the shared snapshot.
pub struct MirrorHandler {
    snapshot: Arc<ArcSwap<ChainSnapshot>>,
}

impl MirrorHandler {
    fn update(&self, apply: impl Fn(&mut ChainSnapshot)) {
        self.snapshot.rcu(|current| {
            let mut next = ChainSnapshot::clone(current);
            apply(&mut next);
            next
        });
    }
}

impl RpcHandler for MirrorHandler {
    fn handle(&mut self, request: Request) -> Result<Response, String> {
        match request {
            Request::Ping => Ok(Response::Ack),
            Request::UpdateChain { order } => {
                self.update(|snap| snap.order = order.clone());
                Ok(Response::Ack)
            }
            Request::UpdateParameterIndex { entries } => {
                self.update(|snap| snap.entries = entries.clone());
                Ok(Response::Ack)
            }
            Request::SetCompensationDelay { samples } => {
                self.update(|snap| snap.compensation_delay = samples);
                Ok(Response::Ack)
            }
            Request::GetCompensationDelay => Ok(Response::CompensationDelay {
                samples: self.snapshot.load().compensation_delay,
            }),
        }
    }
}

// ============ Tests ============
