//! MCP tool server integration tests
//!
//! Servers are mocked over HTTP; tools are discovered when the registry is
//! built and invoked through it like any other tool.

use roundtable::core::{Config, RoundtableError};
use roundtable::tools::{McpServer, McpTransportKind, ToolDescriptor, ToolRegistry};
use roundtable::{PipelineSpec, RunStatus};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rpc_result(id: u64, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {"tools": {}},
        "serverInfo": {"name": "mock", "version": "0.1.0"}
    })
}

fn tools_list() -> Value {
    json!({"tools": [
        {
            "name": "fetch",
            "description": "Fetch a URL and return its text",
            "inputSchema": {"type": "object", "properties": {"url": {"type": "string"}}}
        },
        {"name": "read_file", "inputSchema": {"type": "object"}}
    ]})
}

fn text_content(text: &str) -> Value {
    json!({"content": [{"type": "text", "text": text}], "isError": false})
}

/// A streamable HTTP server that issues session `s-1` and answers
/// `tools/call` with an event stream
async fn streamable_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Mcp-Session-Id", "s-1")
                .set_body_json(rpc_result(1, initialize_result())),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(header("mcp-session-id", "s-1"))
        .and(body_partial_json(json!({"method": "notifications/initialized"})))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(header("mcp-session-id", "s-1"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(2, tools_list())))
        .mount(&server)
        .await;

    let reply = rpc_result(3, text_content("Rust 1.80 released"));
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(header("mcp-session-id", "s-1"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": {"name": "fetch", "arguments": {"url": "https://blog.rust-lang.org"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(": ping\n\nevent: message\ndata: {}\n\n", reply),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_streamable_http_discovers_and_calls_tools() {
    let server = streamable_server().await;
    let descriptor = ToolDescriptor::Mcp(McpServer::remote(
        "fetch",
        McpTransportKind::StreamableHttp,
        format!("{}/mcp", server.uri()),
    ));

    let registry = ToolRegistry::from_descriptors(&[descriptor], &Config::default())
        .await
        .unwrap();
    assert_eq!(registry.names(), vec!["fetch", "read_file"]);

    let out = registry
        .invoke("fetch", json!({"url": "https://blog.rust-lang.org"}), None)
        .await
        .unwrap();
    assert_eq!(out, "Rust 1.80 released");
}

#[tokio::test]
async fn test_allowlist_limits_registered_tools() {
    let server = streamable_server().await;
    let mut mcp = McpServer::remote(
        "fetch",
        McpTransportKind::StreamableHttp,
        format!("{}/mcp", server.uri()),
    );
    mcp.tool_allowlist = vec!["fetch".into()];

    let registry = ToolRegistry::from_descriptors(&[ToolDescriptor::Mcp(mcp)], &Config::default())
        .await
        .unwrap();
    assert_eq!(registry.names(), vec!["fetch"]);
    assert!(!registry.contains("read_file"));
}

#[tokio::test]
async fn test_allowlisted_tool_not_offered_is_config_error() {
    let server = streamable_server().await;
    let mut mcp = McpServer::remote(
        "fetch",
        McpTransportKind::StreamableHttp,
        format!("{}/mcp", server.uri()),
    );
    mcp.tool_allowlist = vec!["write_file".into()];

    let err = ToolRegistry::from_descriptors(&[ToolDescriptor::Mcp(mcp)], &Config::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RoundtableError::Config(_)));
    assert!(err
        .to_string()
        .contains("MCP server 'fetch' does not offer tool 'write_file'"));
}

#[tokio::test]
async fn test_tool_error_result_is_invocation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "initialize"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(1, initialize_result())))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "notifications/initialized"})))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/list"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(2, tools_list())))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tools/call"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(
            3,
            json!({"content": [{"type": "text", "text": "path outside allowed roots"}], "isError": true}),
        )))
        .mount(&server)
        .await;

    let descriptor = ToolDescriptor::Mcp(McpServer::remote(
        "filesystem",
        McpTransportKind::StreamableHttp,
        server.uri(),
    ));
    let registry = ToolRegistry::from_descriptors(&[descriptor], &Config::default())
        .await
        .unwrap();

    let err = registry
        .invoke("read_file", json!({"path": "/etc/passwd"}), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("path outside allowed roots"));
}

#[tokio::test]
async fn test_sse_server_with_bearer_token() {
    let server = MockServer::start().await;

    // The stream replays every response up front; the client holds them
    // until the matching request is sent.
    let mut stream = String::from("event: endpoint\ndata: /messages?session=abc\n\n");
    for reply in [
        rpc_result(1, initialize_result()),
        rpc_result(2, tools_list()),
        rpc_result(3, text_content("search results")),
    ] {
        stream.push_str(&format!("event: message\ndata: {}\n\n", reply));
    }

    Mock::given(method("GET"))
        .and(path("/sse"))
        .and(header("authorization", "Bearer exa-token"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(stream, "text/event-stream"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("authorization", "Bearer exa-token"))
        .respond_with(ResponseTemplate::new(202))
        .expect(4)
        .mount(&server)
        .await;

    std::env::set_var("ROUNDTABLE_TEST_MCP_TOKEN", "exa-token");
    let mut mcp = McpServer::remote(
        "exa",
        McpTransportKind::Sse,
        format!("{}/sse", server.uri()),
    );
    mcp.bearer_env = Some("ROUNDTABLE_TEST_MCP_TOKEN".into());

    let registry = ToolRegistry::from_descriptors(&[ToolDescriptor::Mcp(mcp)], &Config::default())
        .await
        .unwrap();
    let out = registry
        .invoke("fetch", json!({"url": "https://exa.ai"}), None)
        .await
        .unwrap();
    assert_eq!(out, "search results");
}

#[tokio::test]
async fn test_unreachable_server_fails_at_configuration() {
    let descriptor = ToolDescriptor::Mcp(McpServer::remote(
        "offline",
        McpTransportKind::StreamableHttp,
        "http://127.0.0.1:1/mcp",
    ));
    let err = ToolRegistry::from_descriptors(&[descriptor], &Config::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RoundtableError::Config(_)));
    assert!(err.to_string().contains("MCP server 'offline' is unavailable"));
}

#[tokio::test]
async fn test_pipeline_tool_participant_calls_mcp_tool() {
    let server = streamable_server().await;
    let spec = PipelineSpec::from_toml(&format!(
        r#"
        marker = "TERMINATE"
        max_turns = 2

        [[tools]]
        kind = "mcp"
        server = "fetch"
        transport = "streamable_http"
        url = "{}/mcp"
        tool_allowlist = ["fetch"]

        [[participants]]
        kind = "tool"
        name = "content_fetcher"
        tool = "fetch"
        arguments = {{ url = "https://blog.rust-lang.org" }}
        suffix = "TERMINATE"
        "#,
        server.uri()
    ))
    .unwrap();

    let result = spec
        .build(&Config::default())
        .await
        .unwrap()
        .run("fetch the Rust blog")
        .await;
    assert_eq!(result.status, RunStatus::Completed);
    assert!(result
        .final_text()
        .unwrap()
        .starts_with("Rust 1.80 released"));
}
