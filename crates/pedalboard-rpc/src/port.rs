//! Message port: the discrete-message boundary between the control and
//! processing contexts. In-process it is a pair of byte channels; the
//! framing stays the same when the transport is a real process or
//! thread boundary.

use crate::error::RpcError;
use crate::protocol::Frame;
use tokio::sync::mpsc;
use tracing::warn;

pub(crate) fn encode(frame: &Frame) -> Result<Vec<u8>, RpcError> {
    Ok(bincode::serialize(frame)?)
}

/// Pull the next well-formed frame off a receiver. Malformed payloads
/// are logged and skipped rather than tearing the bridge down.
pub(crate) async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Option<Frame> {
    loop {
        let bytes = rx.recv().await?;
        match bincode::deserialize(&bytes) {
            Ok(frame) => return Some(frame),
            Err(e) => warn!(error = %e, "dropping malformed frame"),
        }
    }
}

/// One side of a connected port pair.
pub struct MessagePort {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MessagePort {
    /// Two connected ports, one per execution context.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }

    /// Post one frame to the peer. Fails once the peer is gone.
    pub fn post(&self, frame: &Frame) -> Result<(), RpcError> {
        let bytes = encode(frame)?;
        self.tx.send(bytes).map_err(|_| RpcError::Closed)
    }

    /// Next frame from the peer, or `None` once the peer closed.
    pub async fn recv(&mut self) -> Option<Frame> {
        next_frame(&mut self.rx).await
    }

    pub(crate) fn split(
        self,
    ) -> (
        mpsc::UnboundedSender<Vec<u8>>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        (self.tx, self.rx)
    }
}

// ============ Tests ============
