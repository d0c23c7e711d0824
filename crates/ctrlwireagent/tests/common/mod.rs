//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use ctrlwireagent::testing::MockTransport;
use ctrlwireagent::{AgentSession, SessionConfig};
use serde_json::{Value, json};
use std::sync::Arc;

/// Connect a session over a mock transport, answering `initialize`
///
/// Returns the transport, the session, and the initialize request the
/// session sent.
pub async fn connect(config: SessionConfig) -> (Arc<MockTransport>, AgentSession, Value) {
    let transport = Arc::new(MockTransport::new());

    let responder = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let request = transport
                .wait_for_request("initialize")
                .await
                .expect("initialize request was not sent");
            let request_id = request["request_id"].as_str().unwrap().to_string();
            transport.respond_success(&request_id, json!({"commands": [], "output_style": "default"}));
            request
        })
    };

    let session = AgentSession::connect(transport.clone(), config)
        .await
        .expect("session failed to connect");
    let initialize = responder.await.unwrap();

    (transport, session, initialize)
}

/// Inbound `can_use_tool` request
pub fn can_use_tool(request_id: &str, tool_name: &str, input: Value) -> Value {
    json!({
        "type": "control_request",
        "request_id": request_id,
        "request": {
            "subtype": "can_use_tool",
            "tool_name": tool_name,
            "input": input,
            "permission_suggestions": []
        }
    })
}

/// Inbound `hook_callback` request
pub fn hook_request(request_id: &str, callback_id: &str, input: Value) -> Value {
    json!({
        "type": "control_request",
        "request_id": request_id,
        "request": {
            "subtype": "hook_callback",
            "callback_id": callback_id,
            "input": input,
            "tool_use_id": "toolu_01"
        }
    })
}

/// Wait for the response to `request_id` and return its body
pub async fn response_for(transport: &MockTransport, request_id: &str) -> Value {
    transport
        .wait_for_response(request_id)
        .await
        .unwrap_or_else(|| panic!("no control response for {request_id}"))["response"]
        .clone()
}

/// Minimal valid result envelope
pub fn result_message() -> Value {
    json!({
        "type": "result",
        "subtype": "success",
        "duration_ms": 1000,
        "duration_api_ms": 500,
        "is_error": false,
        "num_turns": 1,
        "session_id": "session_123",
        "total_cost_usd": 0.001
    })
}
