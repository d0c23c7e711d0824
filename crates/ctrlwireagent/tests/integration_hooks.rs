//! Integration tests for hook registration and `hook_callback` handling

mod common;

use common::{connect, hook_request, response_for};
use ctrlwireagent::{
    HookEvent, HookMatcher, HookOutput, PermissionDecision, SessionConfig, hook_callback,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn config_with_hook(output: HookOutput) -> SessionConfig {
    SessionConfig::new().with_hook(
        HookEvent::PreToolUse,
        HookMatcher::new("Bash").with_hook(hook_callback(move |_input, _tool_use_id, _ctx| {
            let output = output.clone();
            async move { Ok(output) }
        })),
    )
}

#[tokio::test]
async fn test_initialize_carries_hook_config() {
    let noop = || hook_callback(|_, _, _| async { Ok(HookOutput::new()) });
    let config = SessionConfig::new()
        .with_hook(
            HookEvent::PreToolUse,
            HookMatcher::new("Bash").with_hook(noop()).with_timeout(30.0),
        )
        .with_hook(HookEvent::PostToolUse, HookMatcher::any().with_hook(noop()));

    let (_transport, _session, initialize) = connect(config).await;

    assert_eq!(initialize["request"]["subtype"], "initialize");
    assert_eq!(
        initialize["request"]["hooks"],
        json!({
            "PreToolUse": [{"matcher": "Bash", "hookCallbackIds": ["hook_0"], "timeout": 30.0}],
            "PostToolUse": [{"matcher": null, "hookCallbackIds": ["hook_1"]}]
        })
    );
}

#[tokio::test]
async fn test_reserved_fields_are_renamed() {
    let output = HookOutput::new()
        .with_continue(true)
        .with_async(Some(5000))
        .with_suppress_output(false);
    let (transport, _session, _) = connect(config_with_hook(output)).await;

    transport.push_inbound(hook_request("req_hook", "hook_0", json!({"tool_name": "Bash"})));

    let response = response_for(&transport, "req_hook").await;
    assert_eq!(response["subtype"], "success");
    assert_eq!(
        response["response"],
        json!({"continue": true, "async": true, "asyncTimeout": 5000, "suppressOutput": false})
    );
    assert!(response["response"].get("continue_").is_none());
    assert!(response["response"].get("async_").is_none());
}

#[tokio::test]
async fn test_hook_specific_output_passes_through() {
    let output = HookOutput::new()
        .with_decision("block")
        .with_system_message("Blocked by policy")
        .with_permission_decision(PermissionDecision::Deny, "Security policy violation");
    let (transport, _session, _) = connect(config_with_hook(output)).await;

    transport.push_inbound(hook_request("req_specific", "hook_0", json!({})));

    let response = response_for(&transport, "req_specific").await;
    assert_eq!(
        response["response"],
        json!({
            "decision": "block",
            "systemMessage": "Blocked by policy",
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": "deny",
                "permissionDecisionReason": "Security policy violation"
            }
        })
    );
}

#[tokio::test]
async fn test_arbitrary_output_passes_through() {
    let output = HookOutput::new().with_field("processed", true);
    let (transport, _session, _) = connect(config_with_hook(output)).await;

    transport.push_inbound(hook_request("req_any", "hook_0", json!({})));

    let response = response_for(&transport, "req_any").await;
    assert_eq!(response["response"], json!({"processed": true}));
}

#[tokio::test]
async fn test_empty_output_is_empty_mapping() {
    let (transport, _session, _) = connect(config_with_hook(HookOutput::new())).await;

    transport.push_inbound(hook_request("req_empty", "hook_0", json!({})));

    let response = response_for(&transport, "req_empty").await;
    assert_eq!(response["response"], json!({}));
}

#[tokio::test]
async fn test_hook_receives_input_and_context() {
    let seen: Arc<Mutex<Option<(Value, Option<String>, String)>>> = Arc::new(Mutex::new(None));
    let config = SessionConfig::new().with_hook(
        HookEvent::PostToolUse,
        HookMatcher::any().with_hook(hook_callback({
            let seen = Arc::clone(&seen);
            move |input, tool_use_id, ctx| {
                *seen.lock().unwrap() = Some((input, tool_use_id, ctx.callback_id));
                async { Ok(HookOutput::new()) }
            }
        })),
    );
    let (transport, _session, _) = connect(config).await;

    transport.push_inbound(hook_request(
        "req_ctx",
        "hook_0",
        json!({"hook_event_name": "PostToolUse", "tool_name": "Read"}),
    ));
    response_for(&transport, "req_ctx").await;

    let (input, tool_use_id, callback_id) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(input["tool_name"], "Read");
    assert_eq!(tool_use_id.as_deref(), Some("toolu_01"));
    assert_eq!(callback_id, "hook_0");
}

#[tokio::test]
async fn test_unknown_hook_id() {
    let (transport, session, _) = connect(SessionConfig::new()).await;

    transport.push_inbound(hook_request("req_unknown", "hook_99", json!({})));

    let response = response_for(&transport, "req_unknown").await;
    assert_eq!(
        response,
        json!({
            "subtype": "error",
            "request_id": "req_unknown",
            "error": "no hook callback found for ID: hook_99"
        })
    );
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_hook_error_becomes_error_response() {
    let config = SessionConfig::new().with_hook(
        HookEvent::Stop,
        HookMatcher::any().with_hook(hook_callback(|_, _, _| async {
            Err(anyhow::anyhow!("hook failed: disk full"))
        })),
    );
    let (transport, _session, _) = connect(config).await;

    transport.push_inbound(hook_request("req_fail", "hook_0", json!({})));

    let response = response_for(&transport, "req_fail").await;
    assert_eq!(response["subtype"], "error");
    assert!(response["error"].as_str().unwrap().contains("disk full"));
}

#[tokio::test]
async fn test_unsupported_subtype() {
    let (transport, _session, _) = connect(SessionConfig::new()).await;

    transport.push_inbound(json!({
        "type": "control_request",
        "request_id": "req_mcp",
        "request": {"subtype": "mcp_message", "server_name": "tools", "message": {}}
    }));

    let response = response_for(&transport, "req_mcp").await;
    assert_eq!(response["subtype"], "error");
    assert_eq!(response["error"], "unsupported control request subtype: mcp_message");
}

#[tokio::test]
async fn test_request_without_id_is_dropped() {
    let (transport, _session, _) = connect(config_with_hook(HookOutput::new())).await;
    let before = transport.written().len();

    transport.push_inbound(json!({
        "type": "control_request",
        "request": {"subtype": "hook_callback", "callback_id": "hook_0", "input": {}}
    }));
    transport.push_inbound(hook_request("req_next", "hook_0", json!({})));

    response_for(&transport, "req_next").await;
    assert_eq!(transport.written().len(), before + 1);
}
