//! Local proxy for a remote MCP tool.
//!
//! Implements [`Tool`] by forwarding each call to the owning client's
//! `tools/call`. Marked remote so the dispatcher applies transport retry
//! and classification.

use crate::error::ToolUniverseError;
use crate::mcp::client::McpClient;
use crate::tools::Tool;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug)]
pub struct McpProxyTool {
    /// Tool name on the remote server, without the local prefix
    remote_name: String,
    client: Arc<McpClient>,
}

impl McpProxyTool {
    pub fn new(remote_name: impl Into<String>, client: Arc<McpClient>) -> Self {
        Self {
            remote_name: remote_name.into(),
            client,
        }
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }
}

#[async_trait]
impl Tool for McpProxyTool {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolUniverseError> {
        self.client.call_tool(&self.remote_name, arguments).await
    }

    fn is_remote(&self) -> bool {
        true
    }
}
