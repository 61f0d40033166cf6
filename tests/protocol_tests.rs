//! JSON-RPC framing and MCP method handling

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::FakeEngine;
use geogebra_mcp_server::geogebra::EngineSession;
use geogebra_mcp_server::mcp::server::McpServer;
use geogebra_mcp_server::mcp::types::{error_codes, JsonRpcResponse, RequestId, MCP_VERSION};

fn server_with(engine: Arc<FakeEngine>) -> McpServer {
    let session: Arc<dyn EngineSession> = engine;
    McpServer::new(session).unwrap()
}

fn server() -> McpServer {
    server_with(Arc::new(FakeEngine::new()))
}

async fn send(server: &mut McpServer, message: Value) -> JsonRpcResponse {
    server
        .handle_message(&message.to_string())
        .await
        .expect("request gets a response")
}

/// Decode the JSON payload inside a `tools/call` result
fn text_payload(result: &Value) -> Value {
    let text = result["content"][0]["text"].as_str().expect("text content");
    serde_json::from_str(text).expect("payload is JSON")
}

fn error_code(response: &JsonRpcResponse) -> i32 {
    response.error.as_ref().expect("error response").code
}

#[tokio::test]
async fn test_initialize() {
    let mut server = server();

    let response = send(
        &mut server,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": MCP_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }
        }),
    )
    .await;

    assert_eq!(response.id, Some(RequestId::Number(1)));
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], MCP_VERSION);
    assert_eq!(result["serverInfo"]["name"], "geogebra-mcp");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_initialized_notification_has_no_response() {
    let mut server = server();
    assert!(!server.is_initialized());

    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;

    assert!(response.is_none());
    assert!(server.is_initialized());
}

#[tokio::test]
async fn test_null_id_request_is_answered() {
    let mut server = server();

    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#)
        .await
        .expect("null id is a request, not a notification");

    assert_eq!(response.id, Some(RequestId::Null));
    assert!(response.error.is_none());

    let wire = serde_json::to_value(&response).unwrap();
    assert!(wire["id"].is_null());
    assert_eq!(wire["result"]["tools"].as_array().map(Vec::len), Some(9));
}

#[tokio::test]
async fn test_unknown_notification_is_ignored() {
    let mut server = server();
    let response = server
        .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{}}"#)
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn test_ping() {
    let mut server = server();
    let response = send(&mut server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
    assert_eq!(response.id, Some(RequestId::String("p".to_string())));
    assert_eq!(response.result, Some(json!({})));
}

#[tokio::test]
async fn test_tools_list_is_stable() {
    let mut server = server();

    let list = |id: i64| json!({"jsonrpc": "2.0", "id": id, "method": "tools/list"});
    let first = send(&mut server, list(1)).await;
    let second = send(&mut server, list(2)).await;

    let first = first.result.unwrap();
    assert_eq!(first, second.result.unwrap());

    let tools = first["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 9);
    assert_eq!(tools[0]["name"], "geogebra_plot_function");
    for tool in tools {
        assert!(tool["description"].as_str().is_some_and(|d| !d.is_empty()));
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn test_tools_call_success() {
    let engine = Arc::new(FakeEngine::new());
    let mut server = server_with(engine.clone());

    let response = send(
        &mut server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "geogebra_plot_function",
                "arguments": {"name": "f", "expression": "x^2"}
            }
        }),
    )
    .await;

    assert!(response.error.is_none());
    let result = response.result.unwrap();
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["type"], "text");

    let payload = text_payload(&result);
    assert_eq!(payload["command"], "f(x) = x^2");
    assert_eq!(engine.commands(), vec!["f(x) = x^2"]);
}

#[tokio::test]
async fn test_tools_call_validation_failure_is_not_protocol_error() {
    let mut server = server();

    let response = send(
        &mut server,
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {
                "name": "geogebra_plot_implicit",
                "arguments": {"name": "bad", "expression": "x^2 - 4"}
            }
        }),
    )
    .await;

    assert!(response.error.is_none());
    assert_eq!(response.result.unwrap()["isError"], true);
}

#[tokio::test]
async fn test_tools_call_unknown_tool_is_tool_failure() {
    let mut server = server();

    let response = send(
        &mut server,
        json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "nope"}
        }),
    )
    .await;

    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    let payload = text_payload(&result);
    assert_eq!(payload["code"], error_codes::TOOL_NOT_FOUND);
}

#[tokio::test]
async fn test_tools_call_without_params() {
    let mut server = server();

    let response = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 10, "method": "tools/call"}),
    )
    .await;
    assert_eq!(error_code(&response), error_codes::INVALID_PARAMS);

    let response = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 11, "method": "tools/call", "params": {"arguments": {}}}),
    )
    .await;
    assert_eq!(error_code(&response), error_codes::INVALID_PARAMS);
    assert_eq!(response.id, Some(RequestId::Number(11)));
}

#[tokio::test]
async fn test_unknown_method() {
    let mut server = server();
    let response = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}),
    )
    .await;
    assert_eq!(error_code(&response), error_codes::METHOD_NOT_FOUND);
    assert_eq!(response.id, Some(RequestId::Number(3)));
}

#[tokio::test]
async fn test_parse_error_has_null_id() {
    let mut server = server();

    let response = server.handle_message("{not json").await.unwrap();
    assert_eq!(error_code(&response), error_codes::PARSE_ERROR);
    assert!(response.id.is_none());

    let wire = serde_json::to_value(&response).unwrap();
    assert!(wire["id"].is_null());
    assert_eq!(wire["jsonrpc"], "2.0");
}

#[tokio::test]
async fn test_invalid_requests() {
    let mut server = server();

    for message in [
        json!([1, 2, 3]),
        json!("ping"),
        json!({"jsonrpc": "1.0", "id": 1, "method": "ping"}),
        json!({"jsonrpc": "2.0", "id": 1}),
        json!({"jsonrpc": "2.0", "id": 1, "method": ""}),
        json!({"jsonrpc": "2.0", "id": [1], "method": "ping"}),
    ] {
        let response = send(&mut server, message.clone()).await;
        assert_eq!(error_code(&response), error_codes::INVALID_REQUEST, "{}", message);
    }
}

#[tokio::test]
async fn test_server_keeps_serving_after_errors() {
    let mut server = server();

    server.handle_message("garbage").await;
    send(&mut server, json!({"jsonrpc": "2.0", "id": 1, "method": "nope"})).await;

    let response = send(&mut server, json!({"jsonrpc": "2.0", "id": 2, "method": "ping"})).await;
    assert!(response.error.is_none());
}
