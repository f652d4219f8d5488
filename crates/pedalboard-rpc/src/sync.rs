//! Control-side driver keeping the processing mirror in step with the
//! chain store.
//!
//! The store emits one [`ChainChanged`] per completed topology
//! mutation; for each one the driver pushes the current order, the
//! parameter table, and the total latency across the bridge, awaiting
//! acknowledgement of each step. The mirror therefore converges on the
//! store's state after every mutation.

use crate::endpoint::RpcEndpoint;
use crate::error::RpcError;
use crate::protocol::Request;
use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use pedalboard_core::chain::{ChainChanged, ChainStore};
use std::sync::Arc;
use tracing::warn;

pub struct ChainSync {
    store: Arc<RwLock<ChainStore>>,
    changes: Receiver<ChainChanged>,
    endpoint: RpcEndpoint,
}

impl ChainSync {
    pub fn new(
        store: Arc<RwLock<ChainStore>>,
        changes: Receiver<ChainChanged>,
        endpoint: RpcEndpoint,
    ) -> Self {
        Self {
            store,
            changes,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &RpcEndpoint {
        &self.endpoint
    }

    /// Push the store's current topology across the bridge. The store
    /// lock is released before the first await.
    pub async fn push_update(&self) -> Result<(), RpcError> {
        let (order, entries, samples) = {
            let store = self.store.read();
            (
                store.order(),
                store.param_index().entries().to_vec(),
                store.compensation_delay(),
            )
        };
        self.endpoint.call(Request::UpdateChain { order }).await?;
        self.endpoint
            .call(Request::UpdateParameterIndex { entries })
            .await?;
        self.endpoint
            .call(Request::SetCompensationDelay { samples })
            .await?;
        Ok(())
    }

    /// Consume change notifications until the store hangs up or the
    /// bridge closes. Non-fatal push failures are logged and the loop
    /// keeps going; the next mutation re-pushes the full topology.
    pub async fn run(self) {
        loop {
            let changes = self.changes.clone();
            let next = tokio::task::spawn_blocking(move || changes.recv()).await;
            match next {
                Ok(Ok(_)) => {
                    if let Err(e) = self.push_update().await {
                        if matches!(e, RpcError::Closed) {
                            break;
                        }
                        warn!(error = %e, "topology push failed");
                    }
                }
                _ => break,
            }
        }
    }
}
