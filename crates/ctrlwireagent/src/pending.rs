//! Pending outbound control requests
//!
//! Every outbound request registers a one-shot waiter keyed by its request id.
//! The reader resolves waiters as responses arrive, in any order. A waiter that
//! gives up (timeout or cancellation) removes its own entry, so a late response
//! finds nothing and is dropped.

use crate::error::{AgentError, Result};
use ctrlwire_protocol::RequestId;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

/// Why the table stopped accepting requests
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Terminal {
    /// The transport failed
    Transport(String),
    /// The stream ended or the session was closed
    Closed,
}

impl Terminal {
    fn error(&self) -> AgentError {
        match self {
            Self::Transport(msg) => AgentError::Transport(msg.clone()),
            Self::Closed => AgentError::Closed,
        }
    }
}

#[derive(Default)]
struct Table {
    waiters: HashMap<RequestId, oneshot::Sender<Result<Value>>>,
    terminal: Option<Terminal>,
}

/// Table of outbound requests awaiting a response
#[derive(Default)]
pub(crate) struct PendingRequests {
    table: Mutex<Table>,
    counter: AtomicU64,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id of the form `req_{counter}_{8 hex}`
    pub(crate) fn next_id(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        RequestId::from_string(format!("req_{}_{}", n, &suffix[..8]))
    }

    /// Register a waiter under a fresh id
    ///
    /// Fails immediately once the table is terminal.
    pub(crate) fn register(self: &Arc<Self>, subtype: &'static str) -> Result<PendingRequest> {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id();

        let mut table = self.lock();
        if let Some(terminal) = &table.terminal {
            return Err(terminal.error());
        }
        table.waiters.insert(id.clone(), tx);
        drop(table);
        debug!(request_id = %id, subtype = %subtype, "registered control request");

        Ok(PendingRequest {
            id,
            subtype,
            rx,
            table: Arc::clone(self),
        })
    }

    /// Complete the waiter for `id`
    ///
    /// Returns false when no waiter is registered, meaning the request was
    /// never sent, already answered, or abandoned.
    pub(crate) fn resolve(&self, id: &RequestId, result: Result<Value>) -> bool {
        let Some(tx) = self.lock().waiters.remove(id) else {
            return false;
        };
        // The receiver may have been dropped between removal and send
        tx.send(result).is_ok()
    }

    /// Fail every waiter and reject future registrations
    ///
    /// The first terminal state wins.
    pub(crate) fn close(&self, terminal: Terminal) {
        let mut table = self.lock();
        let terminal = table.terminal.get_or_insert(terminal).clone();
        for (_, tx) in table.waiters.drain() {
            let _ = tx.send(Err(terminal.error()));
        }
    }

    /// Check if the table has stopped accepting requests
    pub(crate) fn is_terminal(&self) -> bool {
        self.lock().terminal.is_some()
    }

    /// Number of outstanding waiters
    pub(crate) fn len(&self) -> usize {
        self.lock().waiters.len()
    }

    fn remove(&self, id: &RequestId) {
        self.lock().waiters.remove(id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A registered waiter for one outbound request
///
/// Dropping it abandons the request.
pub(crate) struct PendingRequest {
    id: RequestId,
    subtype: &'static str,
    rx: oneshot::Receiver<Result<Value>>,
    table: Arc<PendingRequests>,
}

impl PendingRequest {
    pub(crate) fn id(&self) -> &RequestId {
        &self.id
    }

    pub(crate) fn subtype(&self) -> &'static str {
        self.subtype
    }

    /// Wait for the response, or for `cancel` to complete first
    ///
    /// The error `cancel` resolves to is returned as-is.
    pub(crate) async fn wait_until<F>(mut self, cancel: F) -> Result<Value>
    where
        F: Future<Output = AgentError>,
    {
        tokio::select! {
            biased;
            received = &mut self.rx => received.unwrap_or(Err(AgentError::Closed)),
            err = cancel => Err(err),
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.table.remove(&self.id);
    }
}
