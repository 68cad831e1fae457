use serde::{Deserialize, Serialize};
use serde_json::json;
use stackscout_core::catalog::{Category, Dimension};
use stackscout_core::compare::{MAX_COMPARE, MIN_COMPARE};
use stackscout_core::recommend::{ProjectType, Scale, MAX_CONSTRAINTS, MAX_STACK_SIZE};
use stackscout_core::scoring::Context;
use stackscout_core::ToolOutcome;

use crate::remote::Transport;

// Re-export types needed by tool handlers
pub use super::{JsonRpcError, Server, Tool};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        if outcome.ok {
            return CallToolResult {
                content: vec![Content::Text { text: outcome.text }],
                is_error: None,
                structured_content: None,
            };
        }

        CallToolResult {
            structured_content: Some(json!({
                "error_kind": outcome.error_kind,
                "suggestions": outcome.suggestions,
            })),
            content: vec![Content::Text { text: outcome.text }],
            is_error: Some(true),
        }
    }
}

fn internal_error(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError {
        code: -32603,
        message: format!("Internal error: {e}"),
        data: None,
    }
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
        },
        server_info: ServerInfo {
            name: "stackscout".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(internal_error)
}

fn names<T: std::fmt::Display>(values: &[T]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let context_schema = json!({
        "type": "string",
        "description": "Scoring profile: default, mvp (favours developer experience and cost) or enterprise (favours security and scalability)",
        "enum": names(&Context::ALL)
    });

    let tools = vec![
        Tool {
            name: "list_technologies".to_string(),
            description: "List the technologies in the catalog, grouped by category. Optionally filter to a single category.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "Only list technologies in this category",
                        "enum": names(&Category::ALL)
                    }
                },
                "required": []
            }),
        },
        Tool {
            name: "analyze_tech".to_string(),
            description: "Analyze a single technology: per-dimension scores, strengths, weaknesses and compatible technologies. Unknown ids return close matches.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Technology id (e.g. 'nextjs', 'postgresql'). Use list_technologies to discover ids."
                    },
                    "context": context_schema
                },
                "required": ["id"]
            }),
        },
        Tool {
            name: "compare_techs".to_string(),
            description: format!(
                "Compare {MIN_COMPARE} to {MAX_COMPARE} technologies side by side: weighted ranking, per-dimension winners, pairwise compatibility and a verdict."
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": MIN_COMPARE,
                        "maxItems": MAX_COMPARE,
                        "description": "Technology ids to compare, without duplicates"
                    },
                    "context": context_schema
                },
                "required": ["ids"]
            }),
        },
        Tool {
            name: "score_stack".to_string(),
            description: "Score a complete technology stack with the StackScout API. Returns an overall score, a breakdown and warnings. Ids are validated locally first.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "maxItems": MAX_STACK_SIZE,
                        "description": "Technology ids that make up the stack"
                    },
                    "context": context_schema
                },
                "required": ["ids"]
            }),
        },
        Tool {
            name: "recommend_stack".to_string(),
            description: "Generate a stack blueprint for a project. Submits a job to the StackScout API and waits for it to finish. Without STACKSCOUT_API_KEY only demo mode is available, limited to one recommendation per day.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project_type": {
                        "type": "string",
                        "description": "Kind of project",
                        "enum": names(&ProjectType::ALL)
                    },
                    "scale": {
                        "type": "string",
                        "description": "Expected scale",
                        "enum": names(&Scale::ALL)
                    },
                    "priorities": {
                        "type": "array",
                        "items": {"type": "string", "enum": names(&Dimension::ALL)},
                        "description": "Dimensions that matter most, without duplicates"
                    },
                    "constraints": {
                        "type": "array",
                        "items": {"type": "string"},
                        "maxItems": MAX_CONSTRAINTS,
                        "description": "Free-form constraints (e.g. 'must run on AWS')"
                    },
                    "demo": {
                        "type": "boolean",
                        "description": "Use demo mode even when an API key is configured (default: false)"
                    }
                },
                "required": ["project_type", "scale"]
            }),
        },
    ];

    serde_json::to_value(ToolsList { tools }).map_err(internal_error)
}

pub async fn handle_tools_call<T: Transport>(
    params: Option<serde_json::Value>,
    server: &Server<T>,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError {
            code: -32602,
            message: format!("Invalid params: {e}"),
            data: None,
        })?;

    let outcome = server
        .services
        .call_tool(&params.name, params.arguments, &server.shutdown)
        .await
        .ok_or_else(|| JsonRpcError {
            code: -32602,
            message: format!("Unknown tool: {}", params.name),
            data: None,
        })?;

    if !outcome.ok {
        log::debug!("tool {} failed: {}", params.name, outcome.text);
    }

    serde_json::to_value(CallToolResult::from(outcome)).map_err(internal_error)
}
