//! MCP protocol client.
//!
//! Wraps a transport with the protocol-level concerns: the initialize
//! handshake, request id allocation, per-request timeouts, and decoding
//! of `tools/list` and `tools/call` results. Requests are serialized
//! through a mutex; the dispatcher issues a bounded number of calls per
//! proxy tool, so lock-step throughput is sufficient and keeps the
//! transport free of correlation state.

use crate::error::ToolUniverseError;
use crate::mcp::transport::McpTransport;
use crate::mcp::types::{
    CallToolResult, ListToolsResult, McpNotification, McpRequest, McpToolInfo, PROTOCOL_VERSION,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Client behavior knobs
#[derive(Debug, Clone)]
pub struct McpClientConfig {
    /// Per-request deadline in milliseconds
    pub request_timeout_ms: u64,
    /// Client name reported in the initialize handshake
    pub client_name: String,
    /// Client version reported in the initialize handshake
    pub client_version: String,
}

impl Default for McpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            client_name: "tooluniverse".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// JSON-RPC client over a single transport
#[derive(Debug)]
pub struct McpClient {
    transport: Mutex<Box<dyn McpTransport>>,
    config: McpClientConfig,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(transport: Box<dyn McpTransport>, config: McpClientConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Endpoint description of the underlying transport
    pub async fn endpoint(&self) -> String {
        self.transport.lock().await.endpoint()
    }

    /// Whether the underlying transport has an active connection
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Connect and perform the initialize handshake
    pub async fn initialize(&self) -> Result<(), ToolUniverseError> {
        let mut transport = self.transport.lock().await;
        transport.connect().await?;

        let request = McpRequest::new(
            self.next_id.fetch_add(1, Ordering::SeqCst),
            "initialize",
            Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": self.config.client_name,
                    "version": self.config.client_version,
                }
            })),
        );
        let response = self.roundtrip_locked(&mut transport, &request).await?;
        let result = response
            .into_result()
            .map_err(|e| ToolUniverseError::transport(format!("initialize rejected: {}", e)))?;
        debug!(
            "initialized against {} (server: {})",
            transport.endpoint(),
            result["serverInfo"]["name"].as_str().unwrap_or("unknown")
        );

        transport
            .notify(&McpNotification::new("notifications/initialized", None))
            .await?;
        Ok(())
    }

    /// Fetch the server's tool catalog
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, ToolUniverseError> {
        let result = self.request("tools/list", None).await?;
        let listing: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| ToolUniverseError::transport(format!("decoding tools/list: {}", e)))?;
        info!("discovered {} remote tools", listing.tools.len());
        Ok(listing.tools)
    }

    /// Invoke a remote tool.
    ///
    /// A result flagged `isError` is the remote tool's own failure and
    /// surfaces as an execution error, not a transport error.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolUniverseError> {
        let result = self
            .request(
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await?;

        let call_result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| ToolUniverseError::transport(format!("decoding tools/call: {}", e)))?;

        if call_result.is_error {
            let value = call_result.into_value();
            let message = value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Err(ToolUniverseError::execution(format!(
                "remote tool '{}' failed: {}",
                name, message
            )));
        }
        Ok(call_result.into_value())
    }

    /// Close the underlying transport
    pub async fn shutdown(&self) -> Result<(), ToolUniverseError> {
        self.transport.lock().await.close().await
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ToolUniverseError> {
        let request = McpRequest::new(self.next_id.fetch_add(1, Ordering::SeqCst), method, params);
        let mut transport = self.transport.lock().await;
        let response = self.roundtrip_locked(&mut transport, &request).await?;
        response
            .into_result()
            .map_err(|e| ToolUniverseError::transport(e.to_string()))
    }

    async fn roundtrip_locked(
        &self,
        transport: &mut Box<dyn McpTransport>,
        request: &McpRequest,
    ) -> Result<crate::mcp::types::McpResponse, ToolUniverseError> {
        let deadline = Duration::from_millis(self.config.request_timeout_ms);
        tokio::time::timeout(deadline, transport.roundtrip(request))
            .await
            .map_err(|_| ToolUniverseError::timeout(self.config.request_timeout_ms))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::{McpResponse, McpResponsePayload};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Transport returning scripted responses, re-keyed to the request id
    #[derive(Debug)]
    struct ScriptedTransport {
        responses: VecDeque<Value>,
        connected: bool,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Value>) -> Box<dyn McpTransport> {
            Box::new(Self {
                responses: responses.into(),
                connected: false,
            })
        }
    }

    #[async_trait]
    impl McpTransport for ScriptedTransport {
        async fn connect(&mut self) -> Result<(), ToolUniverseError> {
            self.connected = true;
            Ok(())
        }

        async fn roundtrip(
            &mut self,
            request: &McpRequest,
        ) -> Result<McpResponse, ToolUniverseError> {
            let result = self
                .responses
                .pop_front()
                .ok_or_else(|| ToolUniverseError::transport("script exhausted"))?;
            Ok(McpResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                payload: McpResponsePayload::Success { result },
            })
        }

        async fn notify(&mut self, _n: &McpNotification) -> Result<(), ToolUniverseError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ToolUniverseError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn endpoint(&self) -> String {
            "scripted".to_string()
        }
    }

    #[tokio::test]
    async fn test_initialize_then_list_tools() {
        let transport = ScriptedTransport::new(vec![
            json!({"protocolVersion": "2024-11-05", "serverInfo": {"name": "test-server"}}),
            json!({"tools": [
                {"name": "get_gene_info", "description": "Gene lookup",
                 "inputSchema": {"type": "object", "properties": {}}}
            ]}),
        ]);
        let client = McpClient::new(transport, McpClientConfig::default());

        client.initialize().await.unwrap();
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_gene_info");
    }

    #[tokio::test]
    async fn test_call_tool_decodes_json_content() {
        let transport = ScriptedTransport::new(vec![json!({
            "content": [{"type": "text", "text": "{\"symbol\": \"TP53\"}"}],
            "isError": false
        })]);
        let client = McpClient::new(transport, McpClientConfig::default());

        let value = client
            .call_tool("get_gene_info", json!({"symbol": "TP53"}))
            .await
            .unwrap();
        assert_eq!(value["symbol"], "TP53");
    }

    #[tokio::test]
    async fn test_remote_tool_error_is_execution_error() {
        let transport = ScriptedTransport::new(vec![json!({
            "content": [{"type": "text", "text": "gene not found"}],
            "isError": true
        })]);
        let client = McpClient::new(transport, McpClientConfig::default());

        let err = client.call_tool("get_gene_info", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolUniverseError::Execution { .. }));
        assert!(!err.is_retryable());
    }
}
