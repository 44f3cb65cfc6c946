//! Newline-delimited JSON-RPC over stdio.
//!
//! One message per line on stdin, one response per line on stdout. Requests
//! are handled one at a time in arrival order; notifications get no answer.
//! Logs go to stderr so stdout only ever carries protocol traffic.

use anyhow::{Context, Result};
use mdx_docs_core::contract::{RepositoryHost, TextRewriter};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::jsonrpc::{error_codes, parse_request, JsonRpcRequest, JsonRpcResponse};
use super::tools::{self, CallError};
use crate::services::Services;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "mdx-docs";

/// Handle a single request. Returns `None` for notifications.
pub async fn handle_request<R, H>(
    services: &Services<R, H>,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    let Some(id) = request.id.clone() else {
        debug!(method = %request.method, "Notification received");
        return None;
    };
    let params = request.params.unwrap_or(Value::Null);

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {}, "resources": {} },
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tools::tool_definitions() })),
        "tools/call" => {
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "missing required parameter: name",
                ));
            };
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
            match tools::call_tool(services, name, arguments).await {
                Ok(output) => JsonRpcResponse::success(id, output.to_json()),
                Err(CallError::UnknownTool(name)) => JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Unknown tool: {name}"),
                ),
                Err(CallError::InvalidArguments(reason)) => JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid arguments for tool {name}: {reason}"),
                ),
            }
        }
        "resources/list" => {
            JsonRpcResponse::success(id, json!({ "resources": tools::resource_definitions() }))
        }
        "resources/read" => match params.get("uri").and_then(Value::as_str) {
            None => JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "missing required parameter: uri",
            ),
            Some(uri) => match tools::read_resource(services, uri) {
                Some(contents) => JsonRpcResponse::success(id, contents),
                None => JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Resource not found: {uri}"),
                ),
            },
        },
        other => {
            warn!(method = %other, "Unknown method");
            JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )
        }
    };
    Some(response)
}

/// Serve until `input` reaches end of file.
pub async fn serve<R, H, I, O>(services: &Services<R, H>, input: I, mut output: O) -> Result<()>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    info!(protocol = PROTOCOL_VERSION, "MCP server running on stdio");
    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match parse_request(&line) {
            Ok(request) => {
                debug!(method = %request.method, "Request received");
                handle_request(services, request).await
            }
            Err(error_response) => Some(error_response),
        };
        if let Some(response) = response {
            let mut encoded =
                serde_json::to_string(&response).context("Failed to encode response")?;
            encoded.push('\n');
            output
                .write_all(encoded.as_bytes())
                .await
                .context("Failed to write to stdout")?;
            output.flush().await.context("Failed to flush stdout")?;
        }
    }
    info!("stdin closed, MCP server shutting down");
    Ok(())
}

/// Serve on the process's stdin and stdout.
pub async fn serve_stdio<R, H>(services: &Services<R, H>) -> Result<()>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    serve(services, tokio::io::stdin(), tokio::io::stdout()).await
}
