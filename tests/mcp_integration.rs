//! Integration tests for MCP protocol handling.
//!
//! These tests verify the MCP server's JSON-RPC 2.0 protocol implementation,
//! including request/response handling, error responses, and lifecycle
//! management, with the upstream rerank API mocked by mockito.

use std::collections::HashMap;
use std::sync::Arc;

use mockito::Server;
use rerank_mcp::mcp::protocol::{parse_message, IncomingMessage, RequestId};
use rerank_mcp::mcp::{LineReader, McpHandler, McpServer, MessageWriter, Session};
use rerank_mcp::rerank::HttpRerankClient;
use serde_json::{json, Value};

const PATH: &str = "/v1/models/rerank";

// =============================================================================
// Helpers
// =============================================================================

fn handler_for(url: &str) -> McpHandler {
    McpHandler::new(Arc::new(HttpRerankClient::with_endpoint(format!(
        "{url}{PATH}"
    ))))
}

async fn call(handler: &McpHandler, session: &Session, request: &Value) -> Value {
    let msg = handler
        .handle(session, &request.to_string())
        .await
        .expect("request should be answered");
    serde_json::to_value(msg).unwrap()
}

fn rerank_call(id: i64, arguments: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": "get_reranking", "arguments": arguments}
    })
}

fn decoded_text(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    serde_json::from_str(text).unwrap()
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{
        "id": 1,
        "method": "test"
    }"#;

    let result = parse_message(json);
    assert!(result.is_err());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_initialize_then_ping() {
    let handler = handler_for("http://127.0.0.1:1");
    let session = Session::new();

    let init = call(
        &handler,
        &session,
        &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;
    assert!(init["result"]["protocolVersion"].is_string());
    assert!(session.is_initialized());

    let ping = call(
        &handler,
        &session,
        &json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}),
    )
    .await;
    assert_eq!(ping, json!({"jsonrpc": "2.0", "id": 2, "result": {}}));
}

#[tokio::test]
async fn test_tools_list_is_stable() {
    let handler = handler_for("http://127.0.0.1:1");
    let session = Session::new();
    let list = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"});

    // Before initialisation, after it, and repeated.
    let before = call(&handler, &session, &list).await;
    call(
        &handler,
        &session,
        &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
    )
    .await;
    let after = call(&handler, &session, &list).await;
    let again = call(&handler, &session, &list).await;

    for resp in [&before, &after, &again] {
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "get_reranking");
        assert_eq!(
            tools[0]["inputSchema"]["required"],
            json!(["query", "documents", "api_key"])
        );
    }
}

#[tokio::test]
async fn test_wrong_jsonrpc_version_is_invalid_request() {
    let handler = handler_for("http://127.0.0.1:1");
    let resp = call(
        &handler,
        &Session::new(),
        &json!({"jsonrpc": "1.0", "id": 8, "method": "ping"}),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32600);
    assert_eq!(resp["id"], 8);
}

#[tokio::test]
async fn test_malformed_json_is_parse_error() {
    let handler = handler_for("http://127.0.0.1:1");
    let msg = handler
        .handle(&Session::new(), r#"{"jsonrpc": "2.0", "id": 1,"#)
        .await
        .unwrap();
    let resp = serde_json::to_value(msg).unwrap();
    assert_eq!(resp["error"]["code"], -32700);
    assert!(resp["id"].is_null());
}

// =============================================================================
// Tool Call Tests
// =============================================================================

#[tokio::test]
async fn test_rerank_scenario_round_trips_upstream_ranking() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer k")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results":[{"index":1,"relevance_score":0.8},{"index":0,"relevance_score":0.1}]}"#)
        .create_async()
        .await;

    let handler = handler_for(&server.url());
    let resp = call(
        &handler,
        &Session::new(),
        &rerank_call(10, &json!({"query": "ml", "documents": ["a", "b"], "api_key": "k"})),
    )
    .await;

    mock.assert_async().await;
    assert_eq!(resp["id"], 10);
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    assert_eq!(
        resp["result"]["content"][0]["text"],
        r#"{"results":[{"index":1,"relevance_score":0.8},{"index":0,"relevance_score":0.1}]}"#
    );
}

#[tokio::test]
async fn test_rerank_result_matches_upstream_structure() {
    let upstream = json!({"results": [
        {"index": 0, "relevance_score": 0.9},
        {"index": 1, "relevance_score": 0.2}
    ]});

    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(upstream.to_string())
        .create_async()
        .await;

    let handler = handler_for(&server.url());
    let resp = call(
        &handler,
        &Session::new(),
        &rerank_call(11, &json!({"query": "q", "documents": ["x", "y"], "api_key": "k"})),
    )
    .await;

    assert_eq!(decoded_text(&resp), upstream);
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_upstream() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .expect(0)
        .create_async()
        .await;

    let handler = handler_for(&server.url());
    let session = Session::new();

    let cases = [
        json!({"query": "q", "documents": ["a", ""], "api_key": "k"}),
        json!({"query": "q", "documents": ["\t \n"], "api_key": "k"}),
        json!({"query": "q".repeat(10_001), "documents": ["a"], "api_key": "k"}),
        json!({"query": "", "documents": ["a"], "api_key": "k"}),
        json!({"query": "q", "documents": [], "api_key": "k"}),
        json!({"query": "q", "documents": ["a"], "api_key": ""}),
        json!({"query": "q", "documents": ["a"]}),
        json!({"query": 5, "documents": ["a"], "api_key": "k"}),
    ];

    for (i, arguments) in cases.iter().enumerate() {
        let resp = call(&handler, &session, &rerank_call(100, arguments)).await;
        assert_eq!(resp["error"]["code"], -32602, "case {i}: {resp}");
        assert!(resp["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_upstream_status_messages() {
    let cases = [
        (401, "Invalid API key"),
        (429, "Rate limit exceeded"),
        (500, "500"),
        (502, "502"),
    ];

    for (status, expected) in cases {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_status(status)
            .create_async()
            .await;

        let handler = handler_for(&server.url());
        let resp = call(
            &handler,
            &Session::new(),
            &rerank_call(12, &json!({"query": "q", "documents": ["a"], "api_key": "k"})),
        )
        .await;

        assert_eq!(resp["error"]["code"], -32603);
        let message = resp["error"]["message"].as_str().unwrap();
        assert!(message.contains(expected), "{status}: {message}");
    }
}

#[tokio::test]
async fn test_errors_do_not_affect_later_requests() {
    let mut server = Server::new_async().await;
    let _fail = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer bad")
        .with_status(401)
        .create_async()
        .await;
    let _ok = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer good")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results":[{"index":0,"relevance_score":0.5}]}"#)
        .create_async()
        .await;

    let handler = handler_for(&server.url());
    let session = Session::new();

    let bad = call(
        &handler,
        &session,
        &rerank_call(1, &json!({"query": "q", "documents": ["a"], "api_key": "bad"})),
    )
    .await;
    assert!(bad.get("error").is_some());

    let good = call(
        &handler,
        &session,
        &rerank_call(2, &json!({"query": "q", "documents": ["a"], "api_key": "good"})),
    )
    .await;
    assert_eq!(
        decoded_text(&good),
        json!({"results": [{"index": 0, "relevance_score": 0.5}]})
    );
}

// =============================================================================
// Serve Loop Tests
// =============================================================================

#[tokio::test]
async fn test_serve_session_over_lines() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results":[{"index":1,"relevance_score":0.8},{"index":0,"relevance_score":0.1}]}"#)
        .expect(2)
        .create_async()
        .await;

    let mcp = McpServer::new(Arc::new(HttpRerankClient::with_endpoint(format!(
        "{}{PATH}",
        server.url()
    ))));

    let call_args = json!({"query": "ml", "documents": ["a", "b"], "api_key": "k"});
    let lines = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        rerank_call(3, &call_args),
        rerank_call(4, &call_args),
        json!({"jsonrpc": "2.0", "id": 5, "method": "nope"}),
    ];
    let mut input = lines
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    input.push_str("\nnot json\n");

    let writer = mcp
        .serve(
            LineReader::new(input.as_bytes()),
            MessageWriter::new(Vec::new()),
        )
        .await
        .unwrap();

    let out = String::from_utf8(writer.into_inner()).unwrap();
    let responses: Vec<Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    // One response per request plus the parse error; the notification is silent.
    assert_eq!(responses.len(), 6);

    let by_id: HashMap<String, &Value> = responses
        .iter()
        .map(|r| (r["id"].to_string(), r))
        .collect();

    assert_eq!(by_id["1"]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(by_id["2"]["result"]["tools"][0]["name"], "get_reranking");
    assert_eq!(decoded_text(by_id["3"]), decoded_text(by_id["4"]));
    assert_eq!(by_id["5"]["error"]["code"], -32601);
    assert_eq!(by_id["null"]["error"]["code"], -32700);
    assert!(mcp.session().is_initialized());
}
