//! Message router for the control protocol
//!
//! Owns the reader loop over the transport's inbound sequence and splits the
//! traffic in two:
//!
//! - Control envelopes are handled here. Inbound `control_request`s are
//!   answered by the registered callbacks, each in its own task, and
//!   `control_response`s complete the matching outbound request.
//! - Everything else goes through the message parser and is delivered to the
//!   consumer in arrival order.
//!
//! All writes share one lock so concurrent responses never interleave.

use crate::config::EngineConfig;
use crate::envelope;
use crate::error::{AgentError, Result};
use crate::message_parser::parse_message;
use crate::pending::{PendingRequests, Terminal};
use crate::permissions::NO_PERMISSION_CALLBACK;
use crate::registry::CallbackRegistry;
use ctrlwire_protocol::control::{
    CONTROL_CANCEL_REQUEST, CONTROL_REQUEST, CONTROL_RESPONSE, encode_line,
};
use ctrlwire_protocol::{
    CanUseToolRequest, ControlRequest, ControlRequestEnvelope, ControlResponse,
    HookCallbackRequest, HookContext, Message, PermissionUpdate, RequestId, ToolPermissionContext,
};
use ctrlwire_transport::{InboundStream, Transport};
use futures::{FutureExt, Stream, StreamExt};
use serde_json::{Map, Value};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

/// Typed messages delivered to the consumer, in arrival order
///
/// A parse failure is yielded as an `Err` item and the stream continues. A
/// transport failure is yielded as a final `Err` item.
pub struct MessageStream {
    inner: ReceiverStream<Result<Message>>,
}

impl Stream for MessageStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Shared state of the router, reachable from the reader and callback tasks
struct RouterInner {
    transport: Arc<dyn Transport>,
    write_lock: tokio::sync::Mutex<()>,
    pending: Arc<PendingRequests>,
    registry: Arc<CallbackRegistry>,
    config: EngineConfig,
    first_result: watch::Sender<bool>,
    consumer: Mutex<Option<mpsc::Sender<Result<Message>>>>,
}

/// Routes protocol traffic between the consumer, the callbacks and the peer
pub struct MessageRouter {
    inner: Arc<RouterInner>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl MessageRouter {
    /// Take the transport's inbound sequence and start the reader loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        transport: Arc<dyn Transport>,
        registry: Arc<CallbackRegistry>,
        config: EngineConfig,
    ) -> Result<(Self, MessageStream)> {
        let inbound = transport.read_messages()?;
        let (tx, rx) = mpsc::channel(config.message_buffer.max(1));
        let (first_result, _) = watch::channel(false);

        let inner = Arc::new(RouterInner {
            transport,
            write_lock: tokio::sync::Mutex::new(()),
            pending: Arc::new(PendingRequests::new()),
            registry,
            config,
            first_result,
            consumer: Mutex::new(Some(tx)),
        });

        let reader = tokio::spawn(RouterInner::read_loop(Arc::clone(&inner), inbound));

        Ok((
            Self {
                inner,
                reader: Mutex::new(Some(reader)),
            },
            MessageStream {
                inner: ReceiverStream::new(rx),
            },
        ))
    }

    /// Send a control request and wait for its response
    ///
    /// Bounded by the configured control request timeout.
    pub async fn send_request(&self, request: ControlRequest) -> Result<Value> {
        let timeout = self.inner.config.control_request_timeout;
        self.send_request_with_timeout(request, timeout).await
    }

    /// Send a control request and wait at most `timeout` for its response
    ///
    /// # Errors
    ///
    /// `AgentError::Timeout` when the deadline passes. The late response, if
    /// any, is discarded.
    pub async fn send_request_with_timeout(
        &self,
        request: ControlRequest,
        timeout: Duration,
    ) -> Result<Value> {
        let subtype = request.subtype();
        self.dispatch_request(request, async move {
            tokio::time::sleep(timeout).await;
            AgentError::Timeout(subtype.to_string())
        })
        .await
    }

    /// Send a control request and wait until it is answered or `cancel` completes
    ///
    /// Cancelling only drops local bookkeeping; the peer is not notified.
    ///
    /// # Errors
    ///
    /// `AgentError::Cancelled` when `cancel` completes first.
    pub async fn send_request_until<F>(&self, request: ControlRequest, cancel: F) -> Result<Value>
    where
        F: Future<Output = ()>,
    {
        let subtype = request.subtype();
        self.dispatch_request(request, async move {
            cancel.await;
            AgentError::Cancelled(subtype.to_string())
        })
        .await
    }

    async fn dispatch_request<F>(&self, request: ControlRequest, give_up: F) -> Result<Value>
    where
        F: Future<Output = AgentError>,
    {
        let pending = self.inner.pending.register(request.subtype())?;
        debug!(
            request_id = %pending.id(),
            subtype = pending.subtype(),
            "sending control request"
        );

        let line = encode_line(&ControlRequestEnvelope {
            request_id: pending.id().clone(),
            request,
        })?;
        self.inner.write_line(&line).await?;

        pending.wait_until(give_up).await
    }

    /// Serialize and write an arbitrary envelope
    pub async fn write_json(&self, value: &Value) -> Result<()> {
        let line = encode_line(value)?;
        self.inner.write_line(&line).await
    }

    /// Wait until the first `result` message arrives or the stream ends
    ///
    /// Returns false if `timeout` passed first.
    pub async fn wait_for_first_result(&self, timeout: Duration) -> bool {
        let mut seen = self.inner.first_result.subscribe();
        matches!(
            tokio::time::timeout(timeout, seen.wait_for(|seen| *seen)).await,
            Ok(Ok(_))
        )
    }

    /// Number of outbound requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Whether the router has stopped, through close, end of stream, or a
    /// transport failure
    pub fn is_closed(&self) -> bool {
        self.inner.pending.is_terminal()
    }

    /// Stop the reader and fail outstanding requests with `AgentError::Closed`
    pub fn close(&self) {
        self.inner.pending.close(Terminal::Closed);
        lock(&self.inner.consumer).take();
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
        self.inner.first_result.send_replace(true);
        debug!("message router closed");
    }
}

impl Drop for MessageRouter {
    fn drop(&mut self) {
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
    }
}

impl RouterInner {
    async fn read_loop(self: Arc<Self>, mut inbound: InboundStream) {
        while let Some(item) = inbound.next().await {
            match item {
                Ok(value) => self.dispatch(value).await,
                Err(err) => {
                    self.fail_transport(err.to_string());
                    return;
                }
            }

            if self.pending.is_terminal() {
                return;
            }
        }

        debug!("inbound stream ended");
        self.pending.close(Terminal::Closed);
        lock(&self.consumer).take();
        self.first_result.send_replace(true);
    }

    /// Route one decoded inbound object by its envelope type
    async fn dispatch(self: &Arc<Self>, value: Value) {
        let envelope_type = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);
        debug!(
            envelope_type = envelope_type.as_deref().unwrap_or("<none>"),
            "dispatching inbound envelope"
        );

        match envelope_type.as_deref() {
            Some(CONTROL_REQUEST) => self.spawn_control_request(value),
            Some(CONTROL_RESPONSE) => self.handle_control_response(value),
            Some(CONTROL_CANCEL_REQUEST) => {
                let request_id = value
                    .get("request_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                warn!(request_id = %request_id, "ignoring control_cancel_request");
            }
            _ => {
                let parsed = parse_message(value).map_err(AgentError::from);
                if let Ok(message) = &parsed {
                    if message.is_result() {
                        self.first_result.send_replace(true);
                    }
                }
                self.deliver(parsed).await;
            }
        }
    }

    async fn deliver(&self, item: Result<Message>) {
        let consumer = lock(&self.consumer).clone();
        if let Some(tx) = consumer {
            if tx.send(item).await.is_err() {
                debug!("message stream dropped; discarding message");
            }
        }
    }

    fn handle_control_response(&self, value: Value) {
        let Some(body) = value.get("response").cloned() else {
            warn!("control_response without a response body");
            return;
        };
        let response: ControlResponse = match serde_json::from_value(body) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "malformed control_response");
                return;
            }
        };

        let request_id = response.request_id().clone();
        let result = match response {
            ControlResponse::Success { response, .. } => {
                Ok(response.unwrap_or_else(|| Value::Object(Map::new())))
            }
            ControlResponse::Error { error, .. } => Err(AgentError::ControlRequest(error)),
        };

        if self.pending.resolve(&request_id, result) {
            debug!(request_id = %request_id, "resolved control request");
        } else {
            warn!(request_id = %request_id, "control_response for unknown or abandoned request");
        }
    }

    fn spawn_control_request(self: &Arc<Self>, mut value: Value) {
        let Some(request_id) = value.get("request_id").and_then(Value::as_str) else {
            warn!("control_request without request_id; dropping");
            return;
        };
        let request_id = RequestId::from_string(request_id);
        let request = value
            .get_mut("request")
            .map(Value::take)
            .unwrap_or(Value::Null);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.answer_control_request(request_id, request).await;
        });
    }

    /// Run the handler for one inbound control request and write its response
    async fn answer_control_request(&self, request_id: RequestId, request: Value) {
        let subtype = request
            .get("subtype")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        debug!(request_id = %request_id, subtype = %subtype, "handling control request");

        let result = match subtype.as_str() {
            "can_use_tool" => self.handle_can_use_tool(request).await,
            "hook_callback" => self.handle_hook_callback(request).await,
            other => Err(AgentError::Protocol(format!(
                "unsupported control request subtype: {}",
                other
            ))),
        };

        let line = match result {
            Ok(payload) => envelope::success_line(request_id.clone(), payload),
            Err(err) => {
                warn!(request_id = %request_id, subtype = %subtype, error = %err, "control request failed");
                envelope::error_line(request_id.clone(), err.response_message())
            }
        };

        match line {
            Ok(line) => {
                if let Err(err) = self.write_line(&line).await {
                    debug!(request_id = %request_id, error = %err, "control response not written");
                }
            }
            Err(err) => warn!(request_id = %request_id, error = %err, "failed to encode control response"),
        }
    }

    async fn handle_can_use_tool(&self, request: Value) -> Result<Value> {
        let request: CanUseToolRequest = serde_json::from_value(request)
            .map_err(|e| AgentError::Protocol(format!("invalid can_use_tool request: {}", e)))?;

        let Some(callback) = self.registry.permission_callback() else {
            return match self.config.missing_permission_callback.decision() {
                Some(decision) => envelope::permission_payload(&decision),
                None => Err(AgentError::Callback(NO_PERMISSION_CALLBACK.to_string())),
            };
        };

        let suggestions = request
            .permission_suggestions
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<PermissionUpdate>(raw) {
                Ok(update) => Some(update),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable permission suggestion");
                    None
                }
            })
            .collect();

        let mut extra = request.extra;
        extra.remove("subtype");
        let context = ToolPermissionContext {
            suggestions,
            blocked_path: request.blocked_path,
            extra,
        };

        let tool_name = request.tool_name;
        let input = request.input;
        let decision = run_callback(async move { callback(tool_name, input, context).await }).await?;
        envelope::permission_payload(&decision)
    }

    async fn handle_hook_callback(&self, request: Value) -> Result<Value> {
        let request: HookCallbackRequest = serde_json::from_value(request)
            .map_err(|e| AgentError::Protocol(format!("invalid hook_callback request: {}", e)))?;

        let callback = self
            .registry
            .hook(&request.callback_id)
            .ok_or_else(|| AgentError::UnknownCallback(request.callback_id.clone()))?;

        let mut extra = request.extra;
        extra.remove("subtype");
        let context = HookContext {
            callback_id: request.callback_id,
            extra,
        };

        let input = request.input;
        let tool_use_id = request.tool_use_id;
        let output = run_callback(async move { callback(input, tool_use_id, context).await }).await?;
        Ok(envelope::hook_payload(output))
    }

    /// Write one line under the writer lock
    ///
    /// A failed write is fatal to the engine.
    async fn write_line(&self, line: &str) -> Result<()> {
        debug!(bytes = line.len(), "writing envelope");
        let write_result = {
            let _guard = self.write_lock.lock().await;
            self.transport.write(line).await
        };

        if let Err(err) = write_result {
            let message = err.to_string();
            self.fail_transport(message.clone());
            return Err(AgentError::Transport(message));
        }
        Ok(())
    }

    /// Enter the terminal transport-failure state
    ///
    /// Only the first failure is reported to the consumer. The report never
    /// waits on a full consumer channel, so the failing writer returns at once.
    fn fail_transport(&self, message: String) {
        if self.pending.is_terminal() {
            return;
        }

        error!(error = %message, "transport failed; stopping control protocol");
        self.pending.close(Terminal::Transport(message.clone()));
        let consumer = lock(&self.consumer).take();
        if let Some(tx) = consumer {
            match tx.try_send(Err(AgentError::Transport(message))) {
                Ok(()) | Err(TrySendError::Closed(_)) => {}
                Err(TrySendError::Full(item)) => {
                    tokio::spawn(async move {
                        let _ = tx.send(item).await;
                    });
                }
            }
        }
        self.first_result.send_replace(true);
    }
}

/// Await a user callback, converting errors and panics into `AgentError::Callback`
async fn run_callback<T, F>(callback: F) -> Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(callback).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(AgentError::Callback(err.to_string())),
        Err(panic) => Err(AgentError::Callback(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("callback panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("callback panicked: {}", msg)
    } else {
        "callback panicked".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
