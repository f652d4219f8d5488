//! Call/response endpoint with an id-correlated pending-call table.
//!
//! Each endpoint owns one side of a [`MessagePort`]. Outgoing calls get
//! a monotonically increasing id that is never reused, so replies can
//! arrive in any order and a slow call never blocks the settlement of a
//! later one. Teardown settles every outstanding call with
//! [`RpcError::Closed`] rather than leaving callers hanging.

use crate::error::RpcError;
use crate::port::{encode, next_frame, MessagePort};
use crate::protocol::{Frame, Request, Response};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::debug;

/// Locally implemented methods a peer may invoke. Dispatch is a closed
/// match over [`Request`]; adding a method means adding a variant.
pub trait RpcHandler: Send {
    fn handle(&mut self, request: Request) -> Result<Response, String>;
}

/// Handler for endpoints that only issue calls: answers `Ping`, rejects
/// everything else.
pub struct OutboundOnly;

impl RpcHandler for OutboundOnly {
    fn handle(&mut self, request: Request) -> Result<Response, String> {
        match request {
            Request::Ping => Ok(Response::Ack),
            other => Err(format!("unsupported request: {other:?}")),
        }
    }
}

type PendingReply = oneshot::Sender<Result<Response, RpcError>>;

struct Shared {
    sender: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    pending: Mutex<HashMap<u64, PendingReply>>,
    next_call: AtomicU64,
    closed: AtomicBool,
    shutdown: Notify,
}

impl Shared {
    fn settle_outstanding(&self) {
        for (_, reply) in self.pending.lock().drain() {
            let _ = reply.send(Err(RpcError::Closed));
        }
    }
}

pub struct RpcEndpoint {
    shared: Arc<Shared>,
}

impl RpcEndpoint {
    /// Attach an endpoint to one side of a port and start its receive
    /// loop on the current tokio runtime.
    pub fn spawn<H: RpcHandler + 'static>(port: MessagePort, mut handler: H) -> Self {
        let (tx, mut rx) = port.split();
        let shared = Arc::new(Shared {
            sender: Mutex::new(Some(tx.clone())),
            pending: Mutex::new(HashMap::new()),
            next_call: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        let loop_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = loop_shared.shutdown.notified() => break,
                    frame = next_frame(&mut rx) => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                };
                match frame {
                    Frame::Call { call_id, request } => {
                        let reply = match handler.handle(request) {
                            Ok(value) => Frame::ok(call_id, value),
                            Err(message) => Frame::err(call_id, message),
                        };
                        let Ok(bytes) = encode(&reply) else { continue };
                        if tx.send(bytes).is_err() {
                            break;
                        }
                    }
                    Frame::Reply {
                        call_id,
                        value,
                        error,
                    } => {
                        let Some(reply) = loop_shared.pending.lock().remove(&call_id) else {
                            // Teardown can race an in-flight response.
                            debug!(call_id, "dropping reply with no pending call");
                            continue;
                        };
                        let result = match (value, error) {
                            (Some(value), None) => Ok(value),
                            (None, Some(message)) => Err(RpcError::Peer(message)),
                            _ => Err(RpcError::Peer("malformed reply".to_string())),
                        };
                        let _ = reply.send(result);
                    }
                }
            }
            loop_shared.closed.store(true, Ordering::Release);
            loop_shared.sender.lock().take();
            loop_shared.settle_outstanding();
        });

        Self { shared }
    }

    /// Invoke a method on the peer and await the matching response.
    /// Replies correlate by call id, so responses may arrive out of
    /// order without misdelivery.
    pub async fn call(&self, request: Request) -> Result<Response, RpcError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(RpcError::Closed);
        }
        let call_id = self.shared.next_call.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.shared.pending.lock().insert(call_id, reply_tx);

        let bytes = match encode(&Frame::Call { call_id, request }) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.shared.pending.lock().remove(&call_id);
                return Err(e);
            }
        };
        let posted = match self.shared.sender.lock().as_ref() {
            Some(tx) => tx.send(bytes).is_ok(),
            None => false,
        };
        if !posted {
            self.shared.pending.lock().remove(&call_id);
            return Err(RpcError::Closed);
        }

        reply_rx.await.unwrap_or(Err(RpcError::Closed))
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Tear the endpoint down: stop the receive loop, drop the port so
    /// the peer observes the close, and settle outstanding calls with
    /// [`RpcError::Closed`]. Idempotent.
    pub fn destroy(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // notify_one stores a permit, so a loop busy handling a frame
        // still observes the shutdown on its next select.
        self.shared.shutdown.notify_one();
        self.shared.sender.lock().take();
        self.shared.settle_outstanding();
    }
}

impl Drop for RpcEndpoint {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============ Tests ============
