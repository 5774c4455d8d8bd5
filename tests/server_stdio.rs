//! End-to-end sessions over in-memory streams.

use serde_json::{json, Value};
use tempfile::TempDir;

use workspace_agent_mcp::config::WorkspaceConfig;
use workspace_agent_mcp::{ServerSelection, WorkspaceMcpServer};

async fn session(server: &mut WorkspaceMcpServer, messages: &[String]) -> Vec<Value> {
    let input = messages.join("\n") + "\n";
    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn request(id: u64, method: &str, params: Value) -> String {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }).to_string()
}

fn call(id: u64, tool: &str, arguments: Value) -> String {
    request(id, "tools/call", json!({ "name": tool, "arguments": arguments }))
}

fn files_server(root: &TempDir) -> WorkspaceMcpServer {
    let mut config = WorkspaceConfig::default();
    config.files.allowed_roots = vec![root.path().to_path_buf()];
    WorkspaceMcpServer::from_config(ServerSelection::Files, &config).unwrap()
}

#[tokio::test]
async fn test_handshake_and_listing() {
    let root = TempDir::new().unwrap();
    let mut server = files_server(&root);

    let responses = session(
        &mut server,
        &[
            request(1, "initialize", json!({ "protocolVersion": "2024-11-05" })),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
            request(2, "tools/list", json!({})),
            request(3, "ping", json!({})),
        ],
    )
    .await;

    assert!(server.is_initialized());
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], json!("file-manager"));

    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 11);
    assert_eq!(names.first(), Some(&"batch_rename_files"));
    assert_eq!(names.last(), Some(&"write_file"));

    assert_eq!(responses[2]["id"], json!(3));
    assert_eq!(responses[2]["result"], json!({}));
}

#[tokio::test]
async fn test_file_round_trip_inside_root() {
    let root = TempDir::new().unwrap();
    let file = root.path().join("notes/today.md");
    let file = file.to_string_lossy().into_owned();
    let mut server = files_server(&root);

    let responses = session(
        &mut server,
        &[
            call(1, "write_file", json!({ "file_path": file, "content": "- buy milk" })),
            call(2, "read_file", json!({ "file_path": file })),
            call(3, "get_file_info", json!({ "file_path": file })),
        ],
    )
    .await;

    assert_eq!(
        responses[0]["result"]["content"][0]["text"],
        json!(format!("Successfully wrote 10 characters to '{}'.", file))
    );
    assert_eq!(
        responses[1]["result"]["content"][0]["text"],
        json!(format!("Contents of '{}':\n\n- buy milk", file))
    );
    let info = responses[2]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(info.contains("- Type: File"));
    assert!(info.contains("- Size: 10 bytes"));
}

#[tokio::test]
async fn test_path_outside_root_is_tool_error() {
    let root = TempDir::new().unwrap();
    let mut server = files_server(&root);

    let responses = session(
        &mut server,
        &[call(1, "list_directory", json!({ "path": "/" }))],
    )
    .await;

    assert_eq!(responses[0]["result"]["isError"], json!(true));
    let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("permission denied"));
}

#[tokio::test]
async fn test_protocol_errors() {
    let root = TempDir::new().unwrap();
    let mut server = files_server(&root);

    let responses = session(
        &mut server,
        &[
            "this is not json".to_string(),
            call(2, "read_file", json!({ "wrong": true })),
            call(3, "get_crypto_price", json!({ "symbol": "btc" })),
            request(4, "resources/read", json!({ "uri": "crypto://btc" })),
            request(5, "does/not/exist", json!({})),
        ],
    )
    .await;

    assert_eq!(responses.len(), 5);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], json!(-32700));
    assert_eq!(responses[1]["error"]["code"], json!(-32602));
    assert_eq!(responses[2]["error"]["code"], json!(-32602));
    assert_eq!(responses[3]["error"]["code"], json!(-32602));
    assert_eq!(responses[4]["error"]["code"], json!(-32601));
}

#[tokio::test]
async fn test_file_resource() {
    let root = TempDir::new().unwrap();
    let path = root.path().to_string_lossy().into_owned();
    let mut server = files_server(&root);

    let responses = session(
        &mut server,
        &[
            request(1, "resources/templates/list", json!({})),
            request(2, "resources/read", json!({ "uri": format!("file://{}", path) })),
        ],
    )
    .await;

    let templates = responses[0]["result"]["resourceTemplates"].as_array().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["uriTemplate"], json!("file://{path}"));
    assert_eq!(
        responses[1]["result"]["contents"][0]["text"],
        json!(format!("File resource: {} (exists)", path))
    );
}
