//! Request/response correlation over a fire-and-forget envelope transport.
//!
//! Each instance owns its own id namespace (a string prefix plus a
//! counter), so the driver-side and agent-side correlators can never hand
//! out colliding ids. Waiters are resolved at most once: the first of
//! matching-response, timeout, or teardown wins and removes the entry;
//! anything arriving later for that id is discarded.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use tabwire_core::{envelope::RequestId, Error, Result};

/// What a waiter is completed with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Result(Value),
    Error(String),
}

struct Inner {
    prefix: String,
    next: AtomicU64,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Reply>>>,
}

#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Inner>,
}

impl Correlator {
    pub fn new(prefix: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                prefix: prefix.to_string(),
                next: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// A fresh id from this correlator's namespace.
    pub fn next_id(&self) -> RequestId {
        let n = self.inner.next.fetch_add(1, Ordering::SeqCst);
        RequestId::Str(format!("{}-{}", self.inner.prefix, n))
    }

    /// Register a waiter for `id` before the request is sent. Reusing an id
    /// that is still pending is a caller error and rejects the new request
    /// rather than silently replacing the old waiter.
    pub async fn register(&self, id: RequestId) -> Result<PendingReply> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.inner.pending.lock().await;
        if pending.contains_key(&id) {
            return Err(Error::Protocol(format!(
                "Request id {} is already pending",
                id
            )));
        }
        pending.insert(id.clone(), tx);
        Ok(PendingReply {
            id,
            rx,
            correlator: self.clone(),
        })
    }

    /// Complete the waiter for `id`. Returns false when no waiter exists
    /// (stale, duplicate, or foreign id) — such replies are dropped.
    pub async fn resolve(&self, id: &RequestId, reply: Reply) -> bool {
        let sender = {
            let mut pending = self.inner.pending.lock().await;
            pending.remove(id)
        };
        match sender {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                debug!(id = %id, "Discarding reply for unknown or resolved id");
                false
            }
        }
    }

    /// Reject every pending waiter; called on channel teardown so nothing
    /// dangles across a reconnect.
    pub async fn fail_all(&self, reason: &str) {
        let drained: Vec<(RequestId, oneshot::Sender<Reply>)> = {
            let mut pending = self.inner.pending.lock().await;
            pending.drain().collect()
        };
        for (id, tx) in drained {
            debug!(id = %id, reason, "Rejecting pending request");
            let _ = tx.send(Reply::Error(reason.to_string()));
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    async fn abandon(&self, id: &RequestId) {
        let mut pending = self.inner.pending.lock().await;
        pending.remove(id);
    }
}

/// An issued, not-yet-answered request.
pub struct PendingReply {
    id: RequestId,
    rx: oneshot::Receiver<Reply>,
    correlator: Correlator,
}

impl PendingReply {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Give up without waiting, removing the waiter entry. Used when the
    /// request could not be sent after registration.
    pub async fn abandon(self) {
        self.correlator.abandon(&self.id).await;
    }

    /// Await the matching reply. Timeout expiry removes the waiter, so a
    /// late reply for this id resolves nothing.
    pub async fn wait(self, timeout: Duration) -> Result<Reply> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(Error::Transport(
                "Channel torn down while waiting for reply".to_string(),
            )),
            Err(_) => {
                self.correlator.abandon(&self.id).await;
                Err(Error::Timeout(format!(
                    "No reply for request {} within {}ms",
                    self.id,
                    timeout.as_millis()
                )))
            }
        }
    }
}
