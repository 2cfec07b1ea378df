//! Remote tool support over the Model Context Protocol.
//!
//! MCP servers expose a catalog of tools over JSON-RPC 2.0. This module
//! discovers a server's catalog, registers each remote tool behind a
//! local proxy, and forwards calls transparently; once registered, a
//! remote tool is indistinguishable from a local one at the call site.
//!
//! Layers, bottom up:
//!
//! - [`transport`] - byte-level channels: HTTP POST, WebSocket, stdio
//! - [`client`] - the JSON-RPC protocol: handshake, `tools/list`,
//!   `tools/call`, per-request timeouts
//! - [`proxy`] - a [`crate::tools::Tool`] implementation forwarding to a
//!   client
//! - [`loader`] - catalog discovery driven by `MCPAutoLoaderTool`
//!   definition records
//!
//! ```no_run
//! use tooluniverse::mcp::client::{McpClient, McpClientConfig};
//! use tooluniverse::mcp::transport::TransportFactory;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), tooluniverse::error::ToolUniverseError> {
//! let transport = TransportFactory::from_url("http://localhost:8000/mcp")?;
//! let client = McpClient::new(transport, McpClientConfig::default());
//! client.initialize().await?;
//!
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("get_gene_info", json!({"symbol": "TP53"})).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod loader;
pub mod proxy;
pub mod transport;
pub mod types;

pub use client::{McpClient, McpClientConfig};
pub use loader::{McpLoaderConfig, McpToolLoader};
pub use proxy::McpProxyTool;
pub use transport::{McpTransport, TransportFactory};
pub use types::{McpRequest, McpResponse, McpToolInfo};
