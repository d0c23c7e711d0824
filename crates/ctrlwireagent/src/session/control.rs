//! Runtime control methods
//!
//! Each method issues one outbound control request and waits for the peer's
//! response, bounded by the control request timeout.

use crate::error::Result as AgentResult;
use crate::session::core::AgentSession;
use ctrlwire_protocol::{ControlRequest, PermissionMode};
use serde_json::Value;
use std::future::Future;

impl AgentSession {
    /// Interrupt the current turn
    pub async fn interrupt(&self) -> AgentResult<()> {
        self.router.send_request(ControlRequest::Interrupt).await?;
        Ok(())
    }

    /// Change the permission mode for the rest of the session
    pub async fn set_permission_mode(&self, mode: PermissionMode) -> AgentResult<()> {
        self.router
            .send_request(ControlRequest::SetPermissionMode { mode })
            .await?;
        self.state.lock().await.permission_mode = mode;
        Ok(())
    }

    /// Change the model; `None` restores the peer's default
    pub async fn set_model(&self, model: Option<String>) -> AgentResult<()> {
        self.router
            .send_request(ControlRequest::SetModel {
                model: model.clone(),
            })
            .await?;
        self.state.lock().await.current_model = model;
        Ok(())
    }

    /// Restore files to their state at the given user message
    pub async fn rewind_files(&self, user_message_id: impl Into<String>) -> AgentResult<()> {
        self.router
            .send_request(ControlRequest::RewindFiles {
                user_message_id: user_message_id.into(),
            })
            .await?;
        Ok(())
    }

    /// Query the status of the peer's MCP servers
    ///
    /// Returns the raw response payload.
    pub async fn mcp_status(&self) -> AgentResult<Value> {
        self.router.send_request(ControlRequest::McpStatus).await
    }

    /// Send any control request, giving up when `cancel` completes
    ///
    /// # Errors
    ///
    /// `AgentError::Cancelled` if `cancel` completes before the response.
    pub async fn send_control_request_until<F>(
        &self,
        request: ControlRequest,
        cancel: F,
    ) -> AgentResult<Value>
    where
        F: Future<Output = ()>,
    {
        self.router.send_request_until(request, cancel).await
    }

    /// Number of outbound control requests awaiting a response
    pub fn pending_control_requests(&self) -> usize {
        self.router.pending_requests()
    }
}
