//! Tool registry: the authoritative index of callable tools.
//!
//! The registry maps each unique tool name to its declared [`ToolSpec`] and
//! the executable [`Tool`] instance serving it. Specs arrive from JSON
//! definition files, programmatic registration, or remote catalog
//! discovery; all three paths land in the same index and are
//! indistinguishable at lookup time.
//!
//! Registration is last-write-wins: re-registering a name replaces the
//! previous entry and logs a warning, so reloading a definition file is
//! idempotent rather than an error.
//!
//! Shared via `Arc<RwLock<...>>`; lookups take a read lock and are cheap,
//! mutation happens at load time.

use crate::error::ToolUniverseError;
use crate::spec::ToolSpec;
use crate::tools::{Tool, ToolFactory};
use crate::validate::closest_matches;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A registered tool: the declared interface plus its executable
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub spec: ToolSpec,
    pub tool: Arc<dyn Tool>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    tools: HashMap<String, RegisteredTool>,
    /// Names in first-registration order, for stable listings
    order: Vec<String>,
}

/// Thread-safe name-to-tool index.
///
/// Cloning the registry clones the handle, not the index; all clones see
/// the same tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool instance under its spec's name.
    ///
    /// The same `Arc` may be registered under several names (or re-used
    /// across calls); the registry never constructs a second instance.
    pub async fn register(&self, spec: ToolSpec, tool: Arc<dyn Tool>) {
        let mut inner = self.inner.write().await;
        let name = spec.name.clone();
        if inner.tools.contains_key(&name) {
            warn!("replacing existing tool registration '{}'", name);
        } else {
            inner.order.push(name.clone());
        }
        debug!("registered tool '{}' (type {})", name, spec.tool_type);
        inner.tools.insert(name, RegisteredTool { spec, tool });
    }

    /// Build and register a tool from its declarative spec
    pub async fn register_spec(
        &self,
        spec: ToolSpec,
        factory: &ToolFactory,
    ) -> Result<(), ToolUniverseError> {
        let tool = factory.build(&spec)?;
        self.register(spec, tool).await;
        Ok(())
    }

    /// Ingest an array of definition records, building executables through
    /// the factory. Records whose tool type the factory does not know are
    /// skipped with a warning rather than failing the whole load.
    pub async fn load_definitions(
        &self,
        records: &Value,
        factory: &ToolFactory,
    ) -> Result<usize, ToolUniverseError> {
        let records = records.as_array().ok_or_else(|| {
            ToolUniverseError::configuration("tool definition file must contain a JSON array")
        })?;

        let mut loaded = 0;
        for record in records {
            let spec = ToolSpec::from_config(record)?;
            if !factory.knows(&spec.tool_type) {
                warn!(
                    "skipping tool '{}': unknown tool type '{}'",
                    spec.name, spec.tool_type
                );
                continue;
            }
            self.register_spec(spec, factory).await?;
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Load definitions from a JSON file on disk
    pub async fn load_file(
        &self,
        path: impl AsRef<Path>,
        factory: &ToolFactory,
    ) -> Result<usize, ToolUniverseError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ToolUniverseError::configuration(format!(
                "cannot read tool definitions from {}: {}",
                path.display(),
                e
            ))
        })?;
        let records: Value = serde_json::from_str(&contents)?;
        let loaded = self.load_definitions(&records, factory).await?;
        info!("loaded {} tools from {}", loaded, path.display());
        Ok(loaded)
    }

    /// Look up a registered tool by exact name.
    ///
    /// A miss carries "did you mean" candidates from the current index.
    pub async fn lookup(&self, name: &str) -> Result<RegisteredTool, ToolUniverseError> {
        let inner = self.inner.read().await;
        if let Some(entry) = inner.tools.get(name) {
            return Ok(entry.clone());
        }

        let known: Vec<&str> = inner.tools.keys().map(String::as_str).collect();
        let suggestions = closest_matches(name, &known, 3);
        Err(ToolUniverseError::tool_not_found_with_suggestions(
            name,
            suggestions,
        ))
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.tools.contains_key(name)
    }

    /// Registered names in first-registration order
    pub async fn tool_names(&self) -> Vec<String> {
        self.inner.read().await.order.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tools.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tools.is_empty()
    }

    /// All registered specs, in first-registration order
    pub async fn specs(&self) -> Vec<ToolSpec> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|name| inner.tools.get(name))
            .map(|entry| entry.spec.clone())
            .collect()
    }

    /// Specs filtered by implementing tool type
    pub async fn specs_by_type(&self, tool_type: &str) -> Vec<ToolSpec> {
        self.specs()
            .await
            .into_iter()
            .filter(|spec| spec.tool_type == tool_type)
            .collect()
    }

    /// Specs grouped by category, categories and names both sorted.
    ///
    /// Tools without a declared category land under "uncategorized".
    pub async fn specs_by_category(&self) -> Vec<(String, Vec<ToolSpec>)> {
        let mut groups: HashMap<String, Vec<ToolSpec>> = HashMap::new();
        for spec in self.specs().await {
            let category = spec
                .category
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string());
            groups.entry(category).or_default().push(spec);
        }

        let mut grouped: Vec<(String, Vec<ToolSpec>)> = groups.into_iter().collect();
        grouped.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, specs) in &mut grouped {
            specs.sort_by(|a, b| a.name.cmp(&b.name));
        }
        grouped
    }

    /// Remove every tool whose name starts with `prefix`, returning how
    /// many were dropped. Used when refreshing a remote catalog.
    pub async fn remove_prefixed(&self, prefix: &str) -> usize {
        let mut inner = self.inner.write().await;
        let doomed: Vec<String> = inner
            .tools
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        for name in &doomed {
            inner.tools.remove(name);
        }
        inner.order.retain(|name| !name.starts_with(prefix));
        doomed.len()
    }

    /// Drop every registration
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.tools.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::EchoTool;
    use serde_json::json;

    async fn registry_with_echo() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry
            .register(EchoTool::spec(), Arc::new(EchoTool::new()))
            .await;
        registry
    }

    #[tokio::test]
    async fn test_lookup_after_register() {
        let registry = registry_with_echo().await;
        let entry = registry.lookup("echo_tool").await.unwrap();
        assert_eq!(entry.spec.name, "echo_tool");
        assert!(registry.contains("echo_tool").await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_miss_carries_suggestions() {
        let registry = registry_with_echo().await;
        let err = registry.lookup("echo_tol").await.unwrap_err();
        match err {
            ToolUniverseError::ToolNotFound { suggestions, .. } => {
                assert_eq!(suggestions, vec!["echo_tool".to_string()]);
            }
            other => panic!("expected ToolNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let registry = registry_with_echo().await;
        let replacement = EchoTool::spec().with_description("replacement");
        registry
            .register(replacement, Arc::new(EchoTool::new()))
            .await;

        assert_eq!(registry.len().await, 1);
        let entry = registry.lookup("echo_tool").await.unwrap();
        assert_eq!(entry.spec.description, "replacement");
    }

    #[tokio::test]
    async fn test_load_definitions_skips_unknown_types() {
        let registry = ToolRegistry::new();
        let factory = ToolFactory::with_builtins();
        let records = json!([
            {"name": "echo_tool", "type": "EchoTool", "description": "echo"},
            {"name": "exotic", "type": "NoSuchType", "description": "skipped"}
        ]);

        let loaded = registry.load_definitions(&records, &factory).await.unwrap();
        assert_eq!(loaded, 1);
        assert!(registry.contains("echo_tool").await);
        assert!(!registry.contains("exotic").await);
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        tokio::fs::write(
            &path,
            serde_json::to_string(&json!([
                {"name": "echo_tool", "type": "EchoTool", "description": "echo"}
            ]))
            .unwrap(),
        )
        .await
        .unwrap();

        let registry = ToolRegistry::new();
        let factory = ToolFactory::with_builtins();
        assert_eq!(registry.load_file(&path, &factory).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_listing_order_and_category_grouping() {
        let registry = ToolRegistry::new();
        let shared: Arc<dyn Tool> = Arc::new(EchoTool::new());
        registry
            .register(
                ToolSpec::new("zeta", "EchoTool").with_category("search"),
                shared.clone(),
            )
            .await;
        registry
            .register(
                ToolSpec::new("alpha", "EchoTool").with_category("search"),
                shared.clone(),
            )
            .await;
        registry
            .register(ToolSpec::new("beta", "EchoTool"), shared)
            .await;

        // Flat listing preserves registration order
        assert_eq!(registry.tool_names().await, vec!["zeta", "alpha", "beta"]);

        // Grouped listing sorts categories and names
        let grouped = registry.specs_by_category().await;
        assert_eq!(grouped[0].0, "search");
        assert_eq!(grouped[0].1[0].name, "alpha");
        assert_eq!(grouped[1].0, "uncategorized");
    }

    #[tokio::test]
    async fn test_remove_prefixed() {
        let registry = ToolRegistry::new();
        let shared: Arc<dyn Tool> = Arc::new(EchoTool::new());
        registry
            .register(ToolSpec::new("mcp_a", "EchoTool"), shared.clone())
            .await;
        registry
            .register(ToolSpec::new("mcp_b", "EchoTool"), shared.clone())
            .await;
        registry
            .register(ToolSpec::new("local", "EchoTool"), shared)
            .await;

        assert_eq!(registry.remove_prefixed("mcp_").await, 2);
        assert_eq!(registry.tool_names().await, vec!["local"]);
    }
}
