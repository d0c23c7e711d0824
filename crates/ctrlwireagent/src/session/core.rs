//! Core session management
//!
//! Provides the main AgentSession struct, session creation, and message I/O.

use crate::config::{EngineConfig, SessionConfig};
use crate::error::{AgentError, Result as AgentResult};
use crate::registry::CallbackRegistry;
use crate::routing::{MessageRouter, MessageStream};
use crate::session::state::SessionState;
use ctrlwire_protocol::{ControlRequest, Message};
use ctrlwire_transport::{CliTransport, ProcessConfig, Transport};
use futures::StreamExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// An interactive session with a peer process
///
/// Created by [`AgentSession::connect`], which runs the initialize handshake.
/// Messages are read in arrival order through [`AgentSession::next_message`]
/// or [`AgentSession::receive_response`]; control requests from the peer are
/// answered in the background by the callbacks in the [`SessionConfig`].
pub struct AgentSession {
    /// Transport to the peer
    pub(crate) transport: Arc<dyn Transport>,

    /// Message router for protocol communication
    pub(crate) router: MessageRouter,

    /// Consumer side of the message stream
    pub(crate) messages: Mutex<MessageStream>,

    /// Registered callbacks
    pub(crate) registry: Arc<CallbackRegistry>,

    /// Engine settings
    pub(crate) config: EngineConfig,

    /// Session state
    pub(crate) state: Mutex<SessionState>,
}

impl AgentSession {
    /// Connect over `transport` and run the initialize handshake
    ///
    /// Registers the configured hooks under fresh `hook_{n}` ids, starts the
    /// reader, and sends `initialize` with the hooks config and any agent
    /// definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot connect, or the initialize
    /// request fails or times out. The transport is closed in that case.
    pub async fn connect(transport: Arc<dyn Transport>, config: SessionConfig) -> AgentResult<Self> {
        transport.connect().await?;

        let SessionConfig {
            engine,
            permission_callback,
            hooks,
            agents,
        } = config;

        let mut registry = CallbackRegistry::new();
        if let Some(callback) = permission_callback {
            registry.set_permission_callback(callback);
        }
        let hooks_config = registry.register_matchers(&hooks);
        let registry = Arc::new(registry);

        let (router, messages) =
            MessageRouter::start(Arc::clone(&transport), Arc::clone(&registry), engine.clone())?;

        let request = ControlRequest::Initialize {
            hooks: hooks_config,
            agents: (!agents.is_empty()).then_some(agents),
        };
        let server_info = match router
            .send_request_with_timeout(request, engine.initialize_timeout)
            .await
        {
            Ok(info) => info,
            Err(err) => {
                warn!(error = %err, "initialize failed; closing transport");
                router.close();
                let _ = transport.close().await;
                return Err(err);
            }
        };
        debug!(hooks = registry.hook_count(), "session initialized");

        Ok(Self {
            transport,
            router,
            messages: Mutex::new(messages),
            registry,
            config: engine,
            state: Mutex::new(SessionState::connected(server_info)),
        })
    }

    /// Spawn the peer process and connect to it
    pub async fn spawn(process: ProcessConfig, config: SessionConfig) -> AgentResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(CliTransport::new(process));
        Self::connect(transport, config).await
    }

    /// Send a user prompt
    pub async fn send_user_message(&self, prompt: impl Into<String>) -> AgentResult<()> {
        let message = json!({
            "type": "user",
            "message": {"role": "user", "content": prompt.into()},
            "parent_tool_use_id": null,
            "session_id": "default",
        });
        self.router.write_json(&message).await
    }

    /// Send an arbitrary envelope
    pub async fn send_raw(&self, envelope: &Value) -> AgentResult<()> {
        self.router.write_json(envelope).await
    }

    /// Receive the next message
    ///
    /// Returns `None` once the stream has ended. A parse failure yields
    /// `Some(Err(_))` and later calls keep reading.
    pub async fn next_message(&self) -> Option<AgentResult<Message>> {
        self.messages.lock().await.next().await
    }

    /// Receive messages up to and including the next `result` message
    ///
    /// # Errors
    ///
    /// Returns the first error from the stream, or `AgentError::Closed` if
    /// the stream ends before a result.
    pub async fn receive_response(&self) -> AgentResult<Vec<Message>> {
        let mut messages = self.messages.lock().await;
        let mut collected = Vec::new();

        while let Some(item) = messages.next().await {
            let message = item?;
            let done = message.is_result();
            collected.push(message);
            if done {
                return Ok(collected);
            }
        }

        Err(AgentError::Closed)
    }

    /// Close the outbound direction
    ///
    /// With hooks or a permission callback registered the peer may still
    /// call back, so this first waits for the first `result` message, bounded
    /// by the stream-close timeout.
    pub async fn end_input(&self) -> AgentResult<()> {
        if self.registry.has_callbacks()
            && !self
                .router
                .wait_for_first_result(self.config.stream_close_timeout)
                .await
        {
            debug!("no result before stream-close timeout; closing input anyway");
        }

        self.transport.end_input().await?;
        self.state.lock().await.input_ended = true;
        Ok(())
    }

    /// Get the current session state
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Check if the session is connected to the peer
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_connected && !self.router.is_closed()
    }

    /// Payload of the initialize response
    pub async fn server_info(&self) -> Option<Value> {
        self.state.lock().await.server_info.clone()
    }

    /// Close the session and the transport
    ///
    /// Outstanding control requests fail with `AgentError::Closed`.
    pub async fn close(&self) -> AgentResult<()> {
        self.router.close();
        self.state.lock().await.is_connected = false;
        self.transport.close().await?;
        Ok(())
    }
}
