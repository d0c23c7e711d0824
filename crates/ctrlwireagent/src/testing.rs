//! Testing utilities for integration tests
//!
//! Provides an in-memory transport for driving the engine without a real peer
//! process. The test feeds inbound JSON and inspects what the engine wrote.

use ctrlwire_transport::{InboundStream, Result as TransportResult, Transport, TransportError};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// How long the wait helpers wait before giving up
const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// In-memory transport whose inbound side is fed by the test
///
/// Outbound lines are captured as parsed JSON. Lines that are not valid JSON
/// are captured as strings.
pub struct MockTransport {
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<TransportResult<Value>>>>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportResult<Value>>>>,
    written: Mutex<Vec<Value>>,
    write_count: watch::Sender<usize>,
    connected: AtomicBool,
    closed: AtomicBool,
    input_ended: AtomicBool,
    fail_writes: AtomicBool,
}

impl MockTransport {
    /// Create a mock transport
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (write_count, _) = watch::channel(0);
        Self {
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(Some(rx)),
            written: Mutex::new(Vec::new()),
            write_count,
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            input_ended: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Queue an inbound JSON value
    pub fn push_inbound(&self, value: Value) {
        if let Some(tx) = lock(&self.inbound_tx).as_ref() {
            let _ = tx.send(Ok(value));
        }
    }

    /// Queue a fatal read error; the inbound sequence ends after it
    pub fn fail_inbound(&self, error: TransportError) {
        if let Some(tx) = lock(&self.inbound_tx).take() {
            let _ = tx.send(Err(error));
        }
    }

    /// End the inbound sequence cleanly
    pub fn close_inbound(&self) {
        lock(&self.inbound_tx).take();
    }

    /// Answer an outbound control request with a success response
    pub fn respond_success(&self, request_id: &str, payload: Value) {
        self.push_inbound(json!({
            "type": "control_response",
            "response": {"subtype": "success", "request_id": request_id, "response": payload}
        }));
    }

    /// Answer an outbound control request with an error response
    pub fn respond_error(&self, request_id: &str, error: &str) {
        self.push_inbound(json!({
            "type": "control_response",
            "response": {"subtype": "error", "request_id": request_id, "error": error}
        }));
    }

    /// Make every later write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of everything written so far
    pub fn written(&self) -> Vec<Value> {
        lock(&self.written).clone()
    }

    /// Whether `end_input` was called
    pub fn input_ended(&self) -> bool {
        self.input_ended.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` lines were written, then return them all
    ///
    /// Gives up after a few seconds and returns what is there.
    pub async fn wait_for_writes(&self, count: usize) -> Vec<Value> {
        let mut seen = self.write_count.subscribe();
        let _ = tokio::time::timeout(WAIT_LIMIT, seen.wait_for(|n| *n >= count)).await;
        self.written()
    }

    /// Wait for an outbound control request with the given subtype
    pub async fn wait_for_request(&self, subtype: &str) -> Option<Value> {
        let mut seen = self.write_count.subscribe();
        let find = |written: &[Value]| {
            written
                .iter()
                .find(|v| v["type"] == "control_request" && v["request"]["subtype"] == subtype)
                .cloned()
        };

        let waited = tokio::time::timeout(WAIT_LIMIT, async {
            loop {
                if let Some(found) = find(&self.written()) {
                    return Some(found);
                }
                if seen.changed().await.is_err() {
                    return None;
                }
            }
        })
        .await;
        waited.ok().flatten()
    }

    /// Wait for the control response answering `request_id`
    pub async fn wait_for_response(&self, request_id: &str) -> Option<Value> {
        let mut seen = self.write_count.subscribe();
        let waited = tokio::time::timeout(WAIT_LIMIT, async {
            loop {
                let found = self.written().into_iter().find(|v| {
                    v["type"] == "control_response" && v["response"]["request_id"] == request_id
                });
                if found.is_some() {
                    return found;
                }
                if seen.changed().await.is_err() {
                    return None;
                }
            }
        })
        .await;
        waited.ok().flatten()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> TransportResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&self, line: &str) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            )));
        }

        let trimmed = line.trim_end();
        let value = serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.into()));
        let count = {
            let mut written = lock(&self.written);
            written.push(value);
            written.len()
        };
        self.write_count.send_replace(count);
        Ok(())
    }

    async fn end_input(&self) -> TransportResult<()> {
        self.input_ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read_messages(&self) -> TransportResult<InboundStream> {
        let rx = lock(&self.inbound_rx)
            .take()
            .ok_or_else(|| TransportError::Other("inbound stream already taken".into()))?;
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> TransportResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.close_inbound();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_mock_transport_captures_writes() {
        let mock = MockTransport::new();
        mock.write("{\"type\":\"user\"}\n").await.unwrap();
        mock.write("not json\n").await.unwrap();

        let written = mock.wait_for_writes(2).await;
        assert_eq!(written, vec![json!({"type": "user"}), json!("not json")]);
    }

    #[tokio::test]
    async fn test_mock_transport_inbound() {
        let mock = MockTransport::new();
        let mut inbound = mock.read_messages().unwrap();
        assert!(mock.read_messages().is_err());

        mock.push_inbound(json!({"a": 1}));
        mock.fail_inbound(TransportError::Other("gone".into()));
        mock.push_inbound(json!({"ignored": true}));

        assert_eq!(inbound.next().await.unwrap().unwrap(), json!({"a": 1}));
        assert!(inbound.next().await.unwrap().is_err());
        assert!(inbound.next().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_transport_lifecycle() {
        let mock = MockTransport::new();
        assert!(!mock.is_ready());
        mock.connect().await.unwrap();
        assert!(mock.is_ready());

        mock.end_input().await.unwrap();
        assert!(mock.input_ended());

        mock.close().await.unwrap();
        assert!(!mock.is_ready());
        assert!(matches!(
            mock.write("{}\n").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_mock_transport_write_failure() {
        let mock = MockTransport::new();
        mock.set_fail_writes(true);
        assert!(matches!(mock.write("{}\n").await, Err(TransportError::Io(_))));
        assert!(mock.written().is_empty());
    }
}
