use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, post};

use crate::state::AppState;

const ROOT_PATH: &str = "/";
const MCP_PATH: &str = "/mcp";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(ROOT_PATH, mcp_endpoint())
        .route(MCP_PATH, mcp_endpoint())
}

fn mcp_endpoint() -> MethodRouter<AppState> {
    post(mcp_post)
        .options(mcp_preflight)
        .fallback(method_not_allowed)
}

/// CORS preflight: empty 200, headers come from the CORS middleware.
async fn mcp_preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
}

// JSON-RPC failures travel in the envelope; the status line stays 200.
async fn mcp_post(State(state): State<AppState>, body: Bytes) -> Response {
    let response = daemon_mcp_runtime::handle_http_jsonrpc(&state.source, &body).await;
    (StatusCode::OK, Json(response)).into_response()
}
