mod cli;
mod sse;
mod stdio;
mod tools;

pub use cli::App;

use crate::prelude::*;
use crate::remote::{HttpTransport, Transport};
use crate::service::Services;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// JSON-RPC 2.0 types
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<serde_json::Value>,
    method: String,
    params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// MCP Protocol types
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Everything a transport needs to answer requests
pub struct Server<T = HttpTransport> {
    pub services: Services<T>,
    pub verbose: bool,
    /// Cancelled on shutdown so pending job polls stop waiting
    pub shutdown: CancellationToken,
}

impl<T: Transport> Server<T> {
    pub fn new(services: Services<T>, verbose: bool) -> Self {
        Self {
            services,
            verbose,
            shutdown: CancellationToken::new(),
        }
    }
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    let services = crate::prelude::services(&global)?;
    let server = Server::new(services, global.verbose);

    let shutdown = server.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupted, stopping pending work");
            shutdown.cancel();
        }
    });

    match app.command {
        cli::Commands::Stdio => stdio::run_stdio(server).await,
        cli::Commands::Sse(options) => sse::run_sse(options, server).await,
    }
}

/// Answer one JSON-RPC message. Notifications (no `id`) return `None`.
pub async fn handle_request<T: Transport>(
    request_str: &str,
    server: &Server<T>,
) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(request_str) {
        Ok(req) => req,
        Err(e) => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {e}"),
                    data: None,
                }),
            });
        }
    };

    if request.id.is_none() {
        log::debug!("notification {}", request.method);
        return None;
    }

    let result = match request.method.as_str() {
        "initialize" => tools::handle_initialize(),
        "tools/list" => tools::handle_tools_list(),
        "tools/call" => tools::handle_tools_call(request.params, server).await,
        method => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    };

    Some(match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id,
            result: None,
            error: Some(error),
        },
    })
}
