//! Remote catalog discovery.
//!
//! An `MCPAutoLoaderTool` definition record names a server and a local
//! name prefix:
//!
//! ```json
//! {
//!     "name": "expert_feedback_loader",
//!     "type": "MCPAutoLoaderTool",
//!     "description": "Load tools from the expert feedback server",
//!     "fields": {
//!         "server_url": "http://localhost:7000/mcp",
//!         "tool_prefix": "expert_",
//!         "timeout": 30
//!     }
//! }
//! ```
//!
//! The loader connects, fetches the server's catalog, and registers one
//! prefixed proxy per remote tool. Remote argument schemas translate to
//! local [`ParameterSchema`]s, so validation happens locally before any
//! network traffic.

use crate::error::ToolUniverseError;
use crate::mcp::client::{McpClient, McpClientConfig};
use crate::mcp::proxy::McpProxyTool;
use crate::mcp::transport::TransportFactory;
use crate::mcp::types::McpToolInfo;
use crate::registry::ToolRegistry;
use crate::spec::{ParameterSchema, ToolSpec};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Tool type name recognized in definition records
pub const AUTO_LOADER_TYPE: &str = "MCPAutoLoaderTool";

/// Parsed loader configuration
#[derive(Debug, Clone)]
pub struct McpLoaderConfig {
    pub server_url: String,
    /// Prepended to every discovered tool name
    pub tool_prefix: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl McpLoaderConfig {
    /// Extract the configuration from an `MCPAutoLoaderTool` record
    pub fn from_spec(spec: &ToolSpec) -> Result<Self, ToolUniverseError> {
        let server_url = spec
            .fields
            .get("server_url")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolUniverseError::configuration(format!(
                    "loader '{}' needs fields.server_url",
                    spec.name
                ))
            })?
            .to_string();
        let tool_prefix = spec
            .fields
            .get("tool_prefix")
            .and_then(Value::as_str)
            .unwrap_or("mcp_")
            .to_string();
        let timeout_secs = spec
            .fields
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(30);
        Ok(Self {
            server_url,
            tool_prefix,
            timeout_secs,
        })
    }
}

/// Discovers a server's catalog and registers proxies for it
#[derive(Debug)]
pub struct McpToolLoader {
    config: McpLoaderConfig,
    client: Arc<McpClient>,
}

impl McpToolLoader {
    /// Build a loader from its definition record
    pub fn from_spec(spec: &ToolSpec) -> Result<Self, ToolUniverseError> {
        let config = McpLoaderConfig::from_spec(spec)?;
        let transport = TransportFactory::from_url(&config.server_url)?;
        let client_config = McpClientConfig {
            request_timeout_ms: config.timeout_secs * 1000,
            ..Default::default()
        };
        Ok(Self {
            config,
            client: Arc::new(McpClient::new(transport, client_config)),
        })
    }

    pub fn tool_prefix(&self) -> &str {
        &self.config.tool_prefix
    }

    /// Whether this loader has connected to its server
    pub async fn is_connected(&self) -> bool {
        self.client.is_connected().await
    }

    /// Connect, discover the catalog, and register a proxy per tool.
    ///
    /// Returns the number of tools registered.
    pub async fn load_into(&self, registry: &ToolRegistry) -> Result<usize, ToolUniverseError> {
        self.client.initialize().await?;
        let catalog = self.client.list_tools().await?;

        let mut registered = 0;
        for info in catalog {
            let spec = self.local_spec(&info);
            let proxy = McpProxyTool::new(info.name.clone(), self.client.clone());
            registry.register(spec, Arc::new(proxy)).await;
            registered += 1;
        }
        info!(
            "registered {} tools from {} under prefix '{}'",
            registered, self.config.server_url, self.config.tool_prefix
        );
        Ok(registered)
    }

    /// Drop this loader's registrations and re-discover the catalog
    pub async fn refresh(&self, registry: &ToolRegistry) -> Result<usize, ToolUniverseError> {
        let removed = registry.remove_prefixed(&self.config.tool_prefix).await;
        info!(
            "refreshing '{}': removed {} stale registrations",
            self.config.tool_prefix, removed
        );
        self.load_into(registry).await
    }

    /// Translate a catalog entry into a local spec
    fn local_spec(&self, info: &McpToolInfo) -> ToolSpec {
        let parameters = match serde_json::from_value::<ParameterSchema>(info.input_schema.clone())
        {
            Ok(schema) => schema,
            Err(e) => {
                warn!(
                    "tool '{}' has an untranslatable input schema, accepting any object: {}",
                    info.name, e
                );
                ParameterSchema::empty()
            }
        };

        ToolSpec::new(
            format!("{}{}", self.config.tool_prefix, info.name),
            "MCPProxyTool",
        )
        .with_description(info.description.clone().unwrap_or_default())
        .with_parameters(parameters)
        .with_category("remote")
    }
}
