//! Integration tests for outbound control requests
//!
//! Covers the initialize handshake, the runtime control methods, and request
//! correlation: out-of-order responses, timeouts, cancellation and late
//! responses.

mod common;

use common::connect;
use ctrlwireagent::testing::MockTransport;
use ctrlwireagent::{
    AgentDefinition, AgentError, AgentSession, ControlRequest, EngineConfig, PermissionMode,
    SessionConfig,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Wait for the next outbound control request of `subtype` and return its id
async fn request_id_of(transport: &MockTransport, subtype: &str) -> String {
    let request = transport
        .wait_for_request(subtype)
        .await
        .unwrap_or_else(|| panic!("no {subtype} request written"));
    request["request_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_initialize_without_hooks_or_agents() {
    let (_transport, session, initialize) = connect(SessionConfig::new()).await;

    assert_eq!(initialize["type"], "control_request");
    assert_eq!(initialize["request"], json!({"subtype": "initialize", "hooks": {}}));
    assert_eq!(
        session.server_info().await,
        Some(json!({"commands": [], "output_style": "default"}))
    );
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_initialize_with_agents() {
    let config = SessionConfig::new().with_agent(
        "reviewer",
        AgentDefinition::new("Reviews code", "You are a code reviewer")
            .with_tools(["Read", "Grep"])
            .with_model("sonnet"),
    );
    let (_transport, _session, initialize) = connect(config).await;

    assert_eq!(
        initialize["request"]["agents"],
        json!({
            "reviewer": {
                "description": "Reviews code",
                "prompt": "You are a code reviewer",
                "tools": ["Read", "Grep"],
                "model": "sonnet"
            }
        })
    );
}

#[tokio::test]
async fn test_initialize_error_fails_connect() {
    let transport = Arc::new(MockTransport::new());
    let responder = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let id = request_id_of(&transport, "initialize").await;
            transport.respond_error(&id, "unsupported protocol version");
        })
    };

    let result = AgentSession::connect(transport.clone(), SessionConfig::new()).await;
    responder.await.unwrap();

    assert!(matches!(
        result,
        Err(AgentError::ControlRequest(ref msg)) if msg == "unsupported protocol version"
    ));
}

#[tokio::test]
async fn test_initialize_timeout() {
    let transport = Arc::new(MockTransport::new());
    let config = SessionConfig::new()
        .with_engine(EngineConfig::new().with_initialize_timeout(Duration::from_millis(50)));

    let result = AgentSession::connect(transport.clone(), config).await;
    assert!(matches!(result, Err(AgentError::Timeout(ref subtype)) if subtype == "initialize"));
}

#[tokio::test]
async fn test_interrupt() {
    let (transport, session, _) = connect(SessionConfig::new()).await;

    let (result, ()) = tokio::join!(session.interrupt(), async {
        let id = request_id_of(&transport, "interrupt").await;
        transport.respond_success(&id, Value::Null);
    });

    assert!(result.is_ok());
    assert_eq!(session.pending_control_requests(), 0);
}

#[tokio::test]
async fn test_set_permission_mode_updates_state() {
    let (transport, session, _) = connect(SessionConfig::new()).await;

    let (result, request) = tokio::join!(
        session.set_permission_mode(PermissionMode::AcceptEdits),
        async {
            let request = transport.wait_for_request("set_permission_mode").await.unwrap();
            transport.respond_success(request["request_id"].as_str().unwrap(), json!({}));
            request
        }
    );

    result.unwrap();
    assert_eq!(request["request"]["mode"], "acceptEdits");
    assert_eq!(session.state().await.permission_mode, PermissionMode::AcceptEdits);
}

#[tokio::test]
async fn test_set_model_to_default_sends_null() {
    let (transport, session, _) = connect(SessionConfig::new()).await;

    let (result, request) = tokio::join!(session.set_model(None), async {
        let request = transport.wait_for_request("set_model").await.unwrap();
        transport.respond_success(request["request_id"].as_str().unwrap(), json!({}));
        request
    });

    result.unwrap();
    assert_eq!(request["request"], json!({"subtype": "set_model", "model": null}));
    assert!(session.state().await.current_model.is_none());
}

#[tokio::test]
async fn test_rewind_files_and_mcp_status() {
    let (transport, session, _) = connect(SessionConfig::new()).await;

    let (rewind, request) = tokio::join!(session.rewind_files("msg-42"), async {
        let request = transport.wait_for_request("rewind_files").await.unwrap();
        transport.respond_success(request["request_id"].as_str().unwrap(), json!({}));
        request
    });
    rewind.unwrap();
    assert_eq!(request["request"]["user_message_id"], "msg-42");

    let status = json!({"mcpServers": [{"name": "tools", "status": "connected"}]});
    let (result, ()) = tokio::join!(session.mcp_status(), async {
        let id = request_id_of(&transport, "mcp_status").await;
        transport.respond_success(&id, status.clone());
    });
    assert_eq!(result.unwrap(), status);
}

#[tokio::test]
async fn test_error_response() {
    let (transport, session, _) = connect(SessionConfig::new()).await;

    let (result, ()) = tokio::join!(session.interrupt(), async {
        let id = request_id_of(&transport, "interrupt").await;
        transport.respond_error(&id, "nothing to interrupt");
    });

    assert_eq!(
        result,
        Err(AgentError::ControlRequest("nothing to interrupt".into()))
    );
}

#[tokio::test]
async fn test_out_of_order_responses() {
    let (transport, session, _) = connect(SessionConfig::new()).await;

    let (status, interrupt, ()) = tokio::join!(session.mcp_status(), session.interrupt(), async {
        let status_id = request_id_of(&transport, "mcp_status").await;
        let interrupt_id = request_id_of(&transport, "interrupt").await;
        transport.respond_success(&interrupt_id, json!({}));
        transport.respond_success(&status_id, json!({"servers": 2}));
    });

    assert_eq!(status.unwrap(), json!({"servers": 2}));
    interrupt.unwrap();
    assert_eq!(session.pending_control_requests(), 0);
}

#[tokio::test]
async fn test_request_ids_are_unique_and_well_formed() {
    let (transport, session, initialize) = connect(SessionConfig::new()).await;

    for i in 0..3 {
        let (result, ()) = tokio::join!(session.interrupt(), async {
            let written = transport.wait_for_writes(2 + i).await;
            let id = written[1 + i]["request_id"].as_str().unwrap().to_string();
            transport.respond_success(&id, json!({}));
        });
        result.unwrap();
    }

    let ids: Vec<String> = transport
        .written()
        .iter()
        .filter(|v| v["type"] == "control_request")
        .map(|v| v["request_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids[0], initialize["request_id"].as_str().unwrap());

    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    for id in &ids {
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3, "unexpected id {id}");
        assert_eq!(parts[0], "req");
        assert!(parts[1].parse::<u64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[tokio::test]
async fn test_timeout_then_late_response_is_dropped() {
    let config = SessionConfig::new().with_engine(
        EngineConfig::new().with_control_request_timeout(Duration::from_millis(50)),
    );
    let (transport, session, _) = connect(config).await;

    let result = session.interrupt().await;
    assert_eq!(result, Err(AgentError::Timeout("interrupt".into())));
    assert_eq!(session.pending_control_requests(), 0);

    // A late answer for the abandoned request is logged and ignored
    let late_id = request_id_of(&transport, "interrupt").await;
    transport.respond_success(&late_id, json!({}));

    let (status, ()) = tokio::join!(session.mcp_status(), async {
        let id = request_id_of(&transport, "mcp_status").await;
        transport.respond_success(&id, json!({"ok": true}));
    });
    assert_eq!(status.unwrap(), json!({"ok": true}));
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_cancellation() {
    let (transport, session, _) = connect(SessionConfig::new()).await;
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    let (result, ()) = tokio::join!(
        session.send_control_request_until(ControlRequest::Interrupt, async {
            let _ = cancel_rx.await;
        }),
        async {
            transport.wait_for_request("interrupt").await.unwrap();
            cancel_tx.send(()).unwrap();
        }
    );

    assert_eq!(result, Err(AgentError::Cancelled("interrupt".into())));
    assert_eq!(session.pending_control_requests(), 0);

    // Cancellation never notifies the peer
    let written = transport.written();
    assert_eq!(written.last().unwrap()["request"]["subtype"], "interrupt");
}
