//! Model Context Protocol bridge.
//!
//! Exposes the deployment pipeline to tool-calling agents as `deploy_html`,
//! both over streamable HTTP (`POST /mcp`, JSON replies) and over the legacy
//! HTTP+SSE transport (see [`sse`]). The bridge only translates JSON-RPC
//! envelopes; all deployment behavior comes from
//! [`DeployService::deploy`](crate::application::deploy::DeployService::deploy).

pub mod sse;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::domain::submission::Submission;
use crate::infra::http::HttpState;

pub const DEPLOY_TOOL_NAME: &str = "deploy_html";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

const JSONRPC_VERSION: &str = "2.0";
const SERVER_NAME: &str = "pagedrop";
const SERVER_INSTRUCTIONS: &str =
    "Packages an HTML page and uploads it to a preview platform, returning a preview URL.";
const DEPLOY_TOOL_DESCRIPTION: &str = "Deploy a complete HTML page to the online preview server. \
Pass the full page source in the `html` argument; the result contains a preview URL that can be \
opened immediately.";

pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub fn build_mcp_router() -> Router<HttpState> {
    Router::new()
        .route("/mcp", post(handle_rpc))
        .route(sse::STREAM_PATH, get(sse::open_stream))
        .route(sse::MESSAGES_PATH, post(sse::post_message))
}

async fn handle_rpc(State(state): State<HttpState>, body: Bytes) -> Response {
    match process_message(&state, &body).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Answer one JSON-RPC message. Notifications yield `None`.
async fn process_message(state: &HttpState, body: &[u8]) -> Option<RpcResponse> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            return Some(RpcResponse::failure(
                Value::Null,
                RpcError::new(codes::PARSE_ERROR, format!("parse error: {err}")),
            ));
        }
    };

    // Only an absent `id` marks a notification; an explicit null still gets a reply.
    let id = value.get("id").cloned();

    let request = match serde_json::from_value::<RpcRequest>(value) {
        Ok(request) => request,
        Err(err) => {
            return Some(RpcResponse::failure(
                id.unwrap_or(Value::Null),
                RpcError::new(codes::INVALID_REQUEST, format!("invalid request: {err}")),
            ));
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Some(RpcResponse::failure(
            id.unwrap_or(Value::Null),
            RpcError::new(codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        ));
    }

    let Some(id) = id else {
        debug!(
            target = "pagedrop::mcp",
            method = %request.method,
            "notification acknowledged"
        );
        return None;
    };

    let response = match dispatch(state, &request.method, request.params).await {
        Ok(result) => RpcResponse::success(id, result),
        Err(error) => RpcResponse::failure(id, error),
    };
    Some(response)
}

async fn dispatch(
    state: &HttpState,
    method: &str,
    params: Option<Value>,
) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(initialize(params.as_ref())),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": [deploy_tool_descriptor()] })),
        "tools/call" => call_tool(state, params).await,
        other => Err(RpcError::new(
            codes::METHOD_NOT_FOUND,
            format!("method `{other}` not found"),
        )),
    }
}

fn initialize(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|params| params.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": SERVER_INSTRUCTIONS,
    })
}

fn deploy_tool_descriptor() -> Value {
    json!({
        "name": DEPLOY_TOOL_NAME,
        "description": DEPLOY_TOOL_DESCRIPTION,
        "inputSchema": {
            "type": "object",
            "properties": {
                "html": {
                    "type": "string",
                    "description": "The complete HTML page source."
                }
            },
            "required": ["html"]
        }
    })
}

async fn call_tool(state: &HttpState, params: Option<Value>) -> Result<Value, RpcError> {
    let params = params.ok_or_else(|| RpcError::new(codes::INVALID_PARAMS, "missing params"))?;
    let call: ToolCallParams = serde_json::from_value(params)
        .map_err(|err| RpcError::new(codes::INVALID_PARAMS, format!("invalid params: {err}")))?;

    if call.name != DEPLOY_TOOL_NAME {
        return Err(RpcError::new(
            codes::INVALID_PARAMS,
            format!("unknown tool `{}`", call.name),
        ));
    }

    let submission: Submission = serde_json::from_value(call.arguments).map_err(|err| {
        RpcError::new(
            codes::INVALID_PARAMS,
            format!("invalid arguments for `{DEPLOY_TOOL_NAME}`: {err}"),
        )
    })?;

    match state.deploy.deploy(submission).await {
        Ok(result) => {
            let structured = serde_json::to_value(&result).map_err(|err| {
                RpcError::new(codes::INTERNAL_ERROR, format!("failed to encode result: {err}"))
            })?;
            Ok(json!({
                "content": [{ "type": "text", "text": structured.to_string() }],
                "structuredContent": structured,
                "isError": false,
            }))
        }
        Err(err) => {
            warn!(
                target = "pagedrop::mcp",
                kind = err.kind(),
                error = %err,
                "tool call failed"
            );
            Ok(json!({
                "content": [{ "type": "text", "text": err.to_string() }],
                "isError": true,
            }))
        }
    }
}
