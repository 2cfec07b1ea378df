//! JSON-RPC 2.0 message types for MCP communication.
//!
//! Requests carry a numeric id for response correlation; notifications
//! carry none and expect no reply. A response holds exactly one of
//! `result` or `error`, modeled as an untagged payload enum.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version identifier, always "2.0"
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision sent during the initialize handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Request message expecting a correlated response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl McpRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// Fire-and-forget message with no response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl McpNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Response correlated to a request by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(flatten)]
    pub payload: McpResponsePayload,
}

/// Exactly one of result or error, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum McpResponsePayload {
    Success { result: Value },
    Error { error: McpError },
}

impl McpResponse {
    /// Unwrap the result, converting a protocol error into `Err`
    pub fn into_result(self) -> Result<Value, McpError> {
        match self.payload {
            McpResponsePayload::Success { result } => Ok(result),
            McpResponsePayload::Error { error } => Err(error),
        }
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl std::fmt::Display for McpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MCP error {}: {}", self.code, self.message)
    }
}

/// A tool entry in a server's `tools/list` catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for the tool's arguments
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// `tools/list` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<McpToolInfo>,
}

/// Content block within a `tools/call` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// `tools/call` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Collapse the content blocks into a single JSON value.
    ///
    /// A lone text block that parses as JSON becomes that value; anything
    /// else is joined as plain text.
    pub fn into_value(self) -> Value {
        let texts: Vec<String> = self
            .content
            .into_iter()
            .map(|Content::Text { text }| text)
            .collect();

        if texts.len() == 1 {
            if let Ok(parsed) = serde_json::from_str::<Value>(&texts[0]) {
                return parsed;
            }
        }
        Value::String(texts.join("\n"))
    }
}
