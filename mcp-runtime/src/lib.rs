use daemon_core::error::codes;
use daemon_core::profile::ProfileDocument;
use serde::Serialize;
use serde_json::{Value, json};

mod tools;
mod upstream;

pub use tools::{Tool, ToolDefinition, execute_tool, tool_definitions};
pub use upstream::{DEFAULT_DOCUMENT_URL, DocumentSource, FetchError};

use tools::argument_text;

const JSONRPC_VERSION: &str = "2.0";
/// Id echoed when the request body cannot be parsed at all.
const PARSE_ERROR_FALLBACK_ID: i64 = 1;

/// Handle one JSON-RPC request body end to end: validate the envelope,
/// fetch and parse the upstream document, then route the method.
///
/// Nothing is shared between calls; each one fetches the document afresh.
pub async fn handle_http_jsonrpc(source: &DocumentSource, body: &[u8]) -> RpcResponse {
    let incoming: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(
                event = "mcp_parse_error",
                body_len = body.len(),
                error = %err,
                "JSON-RPC request body is not valid JSON"
            );
            return error_response(
                Some(json!(PARSE_ERROR_FALLBACK_ID)),
                RpcError::parse_error(),
            );
        }
    };

    // An absent id stays absent in the reply; an explicit `null` is echoed.
    let id = incoming.get("id").cloned();
    if incoming.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return error_response(id, RpcError::invalid_request());
    }

    let content = match source.fetch().await {
        Ok(content) => content,
        Err(err) => {
            tracing::error!(
                event = "mcp_upstream_fetch_failed",
                url = %source.url(),
                error = %err,
                "Failed to fetch daemon document"
            );
            return error_response(id, RpcError::internal("Failed to fetch daemon data"));
        }
    };
    let document = ProfileDocument::parse(&content);

    let method = incoming
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();
    match handle_request(method, incoming.get("params"), &document) {
        Ok(result) => success_response(id, result),
        Err(err) => error_response(id, err),
    }
}

/// Route a validated request against an already parsed document.
pub fn handle_request(
    method: &str,
    params: Option<&Value>,
    document: &ProfileDocument,
) -> Result<Value, RpcError> {
    match method {
        "tools/list" => Ok(tools_list_payload()),
        "tools/call" => handle_tools_call(params, document),
        _ => {
            tracing::warn!(
                event = "mcp_method_not_found",
                method = %method,
                "Unknown JSON-RPC method"
            );
            Err(RpcError::method_not_found(method))
        }
    }
}

pub fn tools_list_payload() -> Value {
    json!({ "tools": tool_definitions() })
}

fn handle_tools_call(
    params: Option<&Value>,
    document: &ProfileDocument,
) -> Result<Value, RpcError> {
    let name = params
        .and_then(|params| params.get("name"))
        .and_then(argument_text)
        .ok_or_else(|| RpcError::invalid_params("Missing tool name"))?;
    let args = params
        .and_then(|params| params.get("arguments"))
        .and_then(Value::as_object);

    let Some(value) = execute_tool(&name, document, args) else {
        tracing::warn!(event = "mcp_tool_not_found", tool = %name, "Unknown MCP tool");
        return Err(RpcError::tool_not_found(&name));
    };

    tracing::info!(event = "mcp_tool_call", tool = %name, "MCP tool call served");
    Ok(build_tool_call_response(&value))
}

fn build_tool_call_response(value: &Value) -> Value {
    let text = match value {
        Value::String(text) => text.clone(),
        other => to_pretty_json(other),
    };
    json!({
        "content": [{ "type": "text", "text": text }]
    })
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn parse_error() -> Self {
        Self {
            code: codes::PARSE_ERROR,
            message: "Parse error".to_string(),
        }
    }

    pub fn invalid_request() -> Self {
        Self {
            code: codes::INVALID_REQUEST,
            message: "Invalid Request".to_string(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
        }
    }

    pub fn tool_not_found(tool: &str) -> Self {
        Self {
            code: codes::METHOD_NOT_FOUND,
            message: format!("Tool not found: {tool}"),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_PARAMS,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: codes::INTERNAL_ERROR,
            message: message.into(),
        }
    }
}

/// Exactly one of `result` / `error`, enforced by the type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcOutcome {
    Result(Value),
    Error(RpcError),
}

/// JSON-RPC 2.0 response envelope: `jsonrpc`, then `result` or `error`, then `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    #[serde(flatten)]
    outcome: RpcOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
}

impl RpcResponse {
    pub fn outcome(&self) -> &RpcOutcome {
        &self.outcome
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn error(&self) -> Option<&RpcError> {
        match &self.outcome {
            RpcOutcome::Error(err) => Some(err),
            RpcOutcome::Result(_) => None,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            RpcOutcome::Result(result) => Some(result),
            RpcOutcome::Error(_) => None,
        }
    }
}

pub fn success_response(id: Option<Value>, result: Value) -> RpcResponse {
    RpcResponse {
        jsonrpc: JSONRPC_VERSION,
        outcome: RpcOutcome::Result(result),
        id,
    }
}

pub fn error_response(id: Option<Value>, error: RpcError) -> RpcResponse {
    RpcResponse {
        jsonrpc: JSONRPC_VERSION,
        outcome: RpcOutcome::Error(error),
        id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    const DOCUMENT: &str = "# Daemon\n[ABOUT]\nBuilder of small tools.\n[MISSION]\nBuild trust.\n[PREFERENCES]\nWork style:\n- Async first\n- Written over spoken\n";

    async fn serve_document(status: StatusCode, body: &'static str) -> DocumentSource {
        let app = Router::new().route("/daemon.md", get(move || async move { (status, body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("test listener should bind");
        let addr = listener
            .local_addr()
            .expect("test listener should have an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        DocumentSource::new(format!("http://{addr}/daemon.md"))
    }

    fn unreachable_source() -> DocumentSource {
        DocumentSource::new("http://127.0.0.1:9/daemon.md")
    }

    fn call(name: &str, arguments: Option<Value>) -> Result<Value, RpcError> {
        let mut params = json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        handle_request("tools/call", Some(&params), &ProfileDocument::parse(DOCUMENT))
    }

    fn text_of(result: &Value) -> &str {
        let content = result["content"]
            .as_array()
            .expect("tool result should carry content");
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        content[0]["text"]
            .as_str()
            .expect("content item should carry text")
    }

    #[test]
    fn tools_list_is_stable_across_calls() {
        let doc = ProfileDocument::parse(DOCUMENT);
        let first = handle_request("tools/list", None, &doc).expect("tools/list should succeed");
        let second = handle_request("tools/list", None, &doc).expect("tools/list should succeed");

        let tools = first["tools"].as_array().expect("tools should be an array");
        assert_eq!(tools.len(), 12);
        assert!(tools.iter().all(|tool| tool.get("inputSchema").is_some()));
        assert_eq!(
            serde_json::to_string(&first).expect("payload should serialize"),
            serde_json::to_string(&second).expect("payload should serialize")
        );
    }

    #[test]
    fn get_section_returns_plain_text() {
        let result = call("get_section", Some(json!({ "section": "mission" })))
            .expect("get_section should succeed");
        assert_eq!(text_of(&result), "Build trust.");
    }

    #[test]
    fn get_section_without_argument_is_a_successful_hint() {
        let result = call("get_section", None).expect("get_section should succeed");
        assert_eq!(text_of(&result), "Section name required");

        let result = call("get_section", Some(json!({ "section": "hobbies" })))
            .expect("get_section should succeed");
        assert_eq!(text_of(&result), "Section 'hobbies' not found");
    }

    #[test]
    fn list_results_are_pretty_printed_json() {
        let result = call("get_preferences", None).expect("get_preferences should succeed");
        assert_eq!(
            text_of(&result),
            "[\n  \"Async first\",\n  \"Written over spoken\"\n]"
        );

        let result = call("get_favorite_movies", None).expect("get_favorite_movies should succeed");
        assert_eq!(text_of(&result), "[]");
    }

    #[test]
    fn get_all_returns_document_as_pretty_json_in_source_order() {
        let doc = ProfileDocument::parse("\n[MISSION]\nBuild trust.\n[ABOUT]\nHi\n[TELOS]\nGoals\n- G1\n");
        let params = json!({ "name": "get_all" });
        let result =
            handle_request("tools/call", Some(&params), &doc).expect("get_all should succeed");

        let expected = format!(
            "{{\n  \"mission\": \"Build trust.\",\n  \"about\": \"Hi\",\n  \"telos\": [\n    \"G1\"\n  ],\n  \"last_updated\": \"{}\"\n}}",
            doc.last_updated_iso()
        );
        assert_eq!(text_of(&result), expected);
    }

    #[test]
    fn unknown_tool_is_a_protocol_error() {
        let err = call("get_weather", None).expect_err("unknown tool should fail");
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Tool not found: get_weather");
    }

    #[test]
    fn missing_tool_name_is_invalid_params() {
        let doc = ProfileDocument::parse(DOCUMENT);
        let cases = [
            None,
            Some(json!({})),
            Some(json!({ "name": null })),
            Some(json!({ "name": "" })),
            Some(json!({ "name": false })),
            Some(json!({ "name": 0 })),
        ];
        for params in cases {
            let err = handle_request("tools/call", params.as_ref(), &doc)
                .expect_err("missing name should fail");
            assert_eq!(err.code, -32602);
            assert_eq!(err.message, "Missing tool name");
        }
    }

    #[test]
    fn non_string_tool_name_is_dispatched_and_not_found() {
        let doc = ProfileDocument::parse(DOCUMENT);
        let params = json!({ "name": 7 });
        let err = handle_request("tools/call", Some(&params), &doc)
            .expect_err("numeric tool name should not resolve");
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Tool not found: 7");
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let doc = ProfileDocument::parse(DOCUMENT);
        let err = handle_request("resources/list", None, &doc).expect_err("method should fail");
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found: resources/list");
    }

    #[test]
    fn envelopes_carry_exactly_one_of_result_or_error() {
        let ok = serde_json::to_value(success_response(Some(json!(3)), json!({ "tools": [] })))
            .expect("envelope should serialize");
        assert_eq!(ok, json!({ "jsonrpc": "2.0", "result": { "tools": [] }, "id": 3 }));

        let err = serde_json::to_value(error_response(
            Some(json!("abc")),
            RpcError::invalid_request(),
        ))
        .expect("envelope should serialize");
        assert_eq!(
            err,
            json!({
                "jsonrpc": "2.0",
                "error": { "code": -32600, "message": "Invalid Request" },
                "id": "abc"
            })
        );
    }

    #[test]
    fn absent_id_is_omitted_but_null_id_is_echoed() {
        let absent = serde_json::to_string(&error_response(None, RpcError::invalid_request()))
            .expect("envelope should serialize");
        assert_eq!(
            absent,
            r#"{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request"}}"#
        );

        let null = serde_json::to_string(&success_response(Some(Value::Null), json!({})))
            .expect("envelope should serialize");
        assert_eq!(null, r#"{"jsonrpc":"2.0","result":{},"id":null}"#);
    }

    #[tokio::test]
    async fn unparseable_body_is_parse_error_with_fallback_id() {
        let response = handle_http_jsonrpc(&unreachable_source(), b"{not json").await;
        assert_eq!(response.error().map(|err| err.code), Some(-32700));
        assert_eq!(response.id(), Some(&json!(1)));
    }

    #[tokio::test]
    async fn wrong_version_is_invalid_request() {
        let body = br#"{"jsonrpc":"1.0","method":"tools/list","id":"req-1"}"#;
        let response = handle_http_jsonrpc(&unreachable_source(), body).await;
        assert_eq!(response.error().map(|err| err.code), Some(-32600));
        assert_eq!(response.id(), Some(&json!("req-1")));

        let response = handle_http_jsonrpc(&unreachable_source(), b"[1, 2]").await;
        assert_eq!(response.error().map(|err| err.code), Some(-32600));
        assert_eq!(response.id(), None);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_internal_error() {
        let body = br#"{"jsonrpc":"2.0","method":"tools/list","id":4}"#;
        let response = handle_http_jsonrpc(&unreachable_source(), body).await;
        let err = response.error().expect("fetch failure should be an error");
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "Failed to fetch daemon data");
        assert_eq!(response.id(), Some(&json!(4)));
    }

    #[tokio::test]
    async fn upstream_error_status_is_internal_error() {
        let source = serve_document(StatusCode::SERVICE_UNAVAILABLE, "down").await;
        let body = br#"{"jsonrpc":"2.0","method":"tools/list","id":5}"#;
        let response = handle_http_jsonrpc(&source, body).await;
        assert_eq!(response.error().map(|err| err.code), Some(-32603));
    }

    #[tokio::test]
    async fn tools_call_round_trip_against_upstream() {
        let source = serve_document(StatusCode::OK, DOCUMENT).await;
        let body = br#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"get_about"},"id":9}"#;
        let response = handle_http_jsonrpc(&source, body).await;

        let result = response.result().expect("tools/call should succeed");
        assert_eq!(text_of(result), "Builder of small tools.");
        assert!(response.error().is_none());
        assert_eq!(response.id(), Some(&json!(9)));
    }

    #[tokio::test]
    async fn unknown_method_still_fetches_then_fails() {
        let source = serve_document(StatusCode::OK, DOCUMENT).await;
        let body = br#"{"jsonrpc":"2.0","method":"prompts/list","id":2}"#;
        let response = handle_http_jsonrpc(&source, body).await;
        assert_eq!(response.error().map(|err| err.code), Some(-32601));
    }
}
