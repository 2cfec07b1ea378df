//! The ToolUniverse engine: one façade over registry, validation,
//! dispatch, hooks, cache and remote loading.
//!
//! ```no_run
//! use tooluniverse::engine::ToolUniverse;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), tooluniverse::error::ToolUniverseError> {
//! let engine = ToolUniverse::builder()
//!     .tool_file("configs/builtin_tools.json")
//!     .build()
//!     .await?;
//!
//! let result = engine
//!     .run(json!({"name": "echo_tool", "arguments": {"text": "hello"}}))
//!     .await?;
//! assert_eq!(result["result"], "hello");
//! # Ok(())
//! # }
//! ```
//!
//! `run()` never fails for tool-level reasons; lookup misses, invalid
//! arguments, execution failures and transport problems all come back as
//! structured error values. The only `Err` it returns is interface
//! misuse, a request value without a tool name.

use crate::cache::ToolCache;
use crate::config::EngineConfig;
use crate::dispatch::{CallOptions, Dispatcher, DispatcherConfig};
use crate::error::ToolUniverseError;
use crate::hooks::HookPipeline;
use crate::mcp::loader::{McpToolLoader, AUTO_LOADER_TYPE};
use crate::registry::ToolRegistry;
use crate::spec::ToolSpec;
use crate::tools::{Tool, ToolFactory};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builder for [`ToolUniverse`]
#[derive(Debug)]
pub struct ToolUniverseBuilder {
    config: EngineConfig,
    tool_files: Vec<PathBuf>,
    programmatic: Vec<(ToolSpec, Arc<dyn Tool>)>,
    factory: Option<ToolFactory>,
    include_builtins: bool,
}

impl Default for ToolUniverseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolUniverseBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            tool_files: Vec::new(),
            programmatic: Vec::new(),
            factory: None,
            include_builtins: true,
        }
    }

    /// Start from a full configuration record
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a tool definition file to load at build time
    pub fn tool_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_files.push(path.into());
        self
    }

    /// Register a tool instance directly.
    ///
    /// The same `Arc` serves every call; per-call construction never
    /// happens for programmatic registrations.
    pub fn tool(mut self, spec: ToolSpec, instance: Arc<dyn Tool>) -> Self {
        self.programmatic.push((spec, instance));
        self
    }

    /// Replace the tool factory used for definition records
    pub fn factory(mut self, factory: ToolFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Skip registering the bundled utility tools
    pub fn without_builtins(mut self) -> Self {
        self.include_builtins = false;
        self
    }

    /// Enable the hook pipeline with the given `{"hooks": [...]}` config
    pub fn hooks(mut self, hook_config: Value) -> Self {
        self.config.hooks_enabled = true;
        self.config.hook_config = hook_config;
        self
    }

    /// Enable the hook pipeline with its default rules (summarization of
    /// oversized outputs)
    pub fn default_hooks(mut self) -> Self {
        self.config.hooks_enabled = true;
        self.config.hook_config = Value::Null;
        self
    }

    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.max_concurrent = max_concurrent;
        self
    }

    pub fn execution_timeout(mut self, timeout: Duration) -> Self {
        self.config.execution_timeout_secs = timeout.as_secs();
        self
    }

    /// Assemble the engine: build the pipeline, register built-ins and
    /// programmatic tools, load definition files.
    ///
    /// Definition records of type `MCPAutoLoaderTool` become pending
    /// remote loaders; call [`ToolUniverse::connect_remote_tools`] to
    /// discover their catalogs.
    pub async fn build(self) -> Result<ToolUniverse, ToolUniverseError> {
        let factory = self.factory.unwrap_or_else(ToolFactory::with_builtins);
        let registry = ToolRegistry::new();
        let cache = ToolCache::new();

        // Enabled hooks without explicit configuration get the default
        // pipeline rather than an empty one
        let hooks = if self.config.hooks_enabled {
            if self.config.hook_config.is_null() {
                HookPipeline::with_defaults()
            } else {
                HookPipeline::from_config(&self.config.hook_config)?
            }
        } else {
            HookPipeline::new()
        };

        let dispatcher_config = DispatcherConfig {
            max_concurrent: self.config.max_concurrent,
            execution_timeout: Duration::from_secs(self.config.execution_timeout_secs),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(
            registry.clone(),
            cache.clone(),
            hooks,
            dispatcher_config,
        );

        if self.include_builtins {
            for spec in crate::tools::builtin::builtin_specs() {
                registry.register_spec(spec, &factory).await?;
            }
        }

        for (spec, instance) in self.programmatic {
            spec.parameters.check_invariants(&spec.name)?;
            registry.register(spec, instance).await;
        }

        let mut loaders = Vec::new();
        let mut files = self.config.tool_files.clone();
        files.extend(self.tool_files);
        for path in &files {
            let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                ToolUniverseError::configuration(format!(
                    "cannot read tool definitions from {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let records: Value = serde_json::from_str(&contents)?;
            let records = records.as_array().ok_or_else(|| {
                ToolUniverseError::configuration(format!(
                    "{} must contain a JSON array of tool definitions",
                    path.display()
                ))
            })?;

            for record in records {
                let spec = ToolSpec::from_config(record)?;
                if spec.tool_type == AUTO_LOADER_TYPE {
                    loaders.push(McpToolLoader::from_spec(&spec)?);
                } else if factory.knows(&spec.tool_type) {
                    registry.register_spec(spec, &factory).await?;
                } else {
                    tracing::warn!(
                        "skipping tool '{}': unknown tool type '{}'",
                        spec.name,
                        spec.tool_type
                    );
                }
            }
        }

        info!(
            "engine ready: {} tools, {} pending remote loaders",
            registry.len().await,
            loaders.len()
        );

        Ok(ToolUniverse {
            registry,
            cache,
            dispatcher,
            factory,
            loaders,
            tool_files: files,
        })
    }
}

/// Registry and dispatch engine behind a uniform call interface
#[derive(Debug)]
pub struct ToolUniverse {
    registry: ToolRegistry,
    cache: ToolCache,
    dispatcher: Dispatcher,
    factory: ToolFactory,
    loaders: Vec<McpToolLoader>,
    tool_files: Vec<PathBuf>,
}

impl ToolUniverse {
    pub fn builder() -> ToolUniverseBuilder {
        ToolUniverseBuilder::new()
    }

    /// Engine with defaults and the built-in tools only
    pub async fn with_defaults() -> Result<Self, ToolUniverseError> {
        Self::builder().build().await
    }

    /// Execute a `{"name": ..., "arguments": {...}}` request.
    ///
    /// Tool-level failures return `Ok` with a structured error value;
    /// `Err` means the request itself was malformed.
    pub async fn run(&self, request: Value) -> Result<Value, ToolUniverseError> {
        let (name, arguments) = parse_request(&request)?;
        Ok(self
            .dispatcher
            .dispatch(&name, arguments, &CallOptions::new())
            .await)
    }

    /// `run` with explicit per-call options
    pub async fn run_with_options(
        &self,
        request: Value,
        options: &CallOptions,
    ) -> Result<Value, ToolUniverseError> {
        let (name, arguments) = parse_request(&request)?;
        Ok(self.dispatcher.dispatch(&name, arguments, options).await)
    }

    /// Execute a batch of requests concurrently, results in input order.
    ///
    /// Malformed elements yield error values at their position; the rest
    /// of the batch is unaffected.
    pub async fn run_batch(&self, requests: Vec<Value>, options: &CallOptions) -> Vec<Value> {
        let calls: Vec<Result<(String, Value), ToolUniverseError>> =
            requests.iter().map(parse_request).collect();

        // Dispatch the well-formed calls, then stitch results back into
        // the original positions
        let well_formed: Vec<(String, Value)> =
            calls.iter().filter_map(|c| c.as_ref().ok().cloned()).collect();
        let mut dispatched = self
            .dispatcher
            .dispatch_batch(well_formed, options)
            .await
            .into_iter();

        calls
            .into_iter()
            .map(|call| match call {
                Ok(_) => dispatched.next().unwrap_or(Value::Null),
                Err(error) => error.to_error_value(),
            })
            .collect()
    }

    /// A lightweight handle for repeated calls to one tool
    pub fn tool_handle(&self, name: impl Into<String>) -> ToolHandle<'_> {
        ToolHandle {
            engine: self,
            name: name.into(),
        }
    }

    /// Register a tool instance at runtime
    pub async fn register_tool(&self, spec: ToolSpec, instance: Arc<dyn Tool>) {
        self.registry.register(spec, instance).await;
    }

    /// Load an additional definition file at runtime
    pub async fn load_tool_file(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<usize, ToolUniverseError> {
        self.registry.load_file(path, &self.factory).await
    }

    /// Connect every pending remote loader and register its catalog.
    ///
    /// Returns the total number of remote tools registered.
    pub async fn connect_remote_tools(&self) -> Result<usize, ToolUniverseError> {
        let mut total = 0;
        for loader in &self.loaders {
            total += loader.load_into(&self.registry).await?;
        }
        Ok(total)
    }

    /// Re-discover every connected server's catalog, dropping stale
    /// registrations first
    pub async fn refresh_remote_tools(&self) -> Result<usize, ToolUniverseError> {
        let mut total = 0;
        for loader in &self.loaders {
            total += loader.refresh(&self.registry).await?;
        }
        Ok(total)
    }

    /// Re-run the load step without restarting: definition files are
    /// re-read (last-write-wins makes this idempotent) and connected
    /// remote catalogs are re-discovered. Loaders that never connected
    /// stay pending.
    ///
    /// Returns the number of tools (re)registered.
    pub async fn refresh(&self) -> Result<usize, ToolUniverseError> {
        let mut total = 0;
        for path in &self.tool_files {
            let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                ToolUniverseError::configuration(format!(
                    "cannot read tool definitions from {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let records: Value = serde_json::from_str(&contents)?;
            for record in records.as_array().into_iter().flatten() {
                let spec = ToolSpec::from_config(record)?;
                // Loaders were materialized at build time; only plain
                // definitions reload here
                if spec.tool_type != AUTO_LOADER_TYPE && self.factory.knows(&spec.tool_type) {
                    self.registry.register_spec(spec, &self.factory).await?;
                    total += 1;
                }
            }
        }

        for loader in &self.loaders {
            if loader.is_connected().await {
                total += loader.refresh(&self.registry).await?;
            }
        }
        Ok(total)
    }

    /// Schema listings for every registered tool
    pub async fn list_tools(&self) -> Vec<Value> {
        self.registry
            .specs()
            .await
            .iter()
            .map(ToolSpec::schema_value)
            .collect()
    }

    /// Registered names in registration order
    pub async fn list_tool_names(&self) -> Vec<String> {
        self.registry.tool_names().await
    }

    /// Specs grouped by category, sorted
    pub async fn tools_by_category(&self) -> Vec<(String, Vec<ToolSpec>)> {
        self.registry.specs_by_category().await
    }

    pub async fn tool_count(&self) -> usize {
        self.registry.len().await
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// (hits, misses) counters for the result cache
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }
}

/// Bound name for repeated invocation of one tool
#[derive(Debug)]
pub struct ToolHandle<'a> {
    engine: &'a ToolUniverse,
    name: String,
}

impl ToolHandle<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the bound tool; same error-value contract as `run`
    pub async fn call(&self, arguments: Value) -> Value {
        self.engine
            .dispatcher
            .dispatch(&self.name, arguments, &CallOptions::new())
            .await
    }

    pub async fn call_with_options(&self, arguments: Value, options: &CallOptions) -> Value {
        self.engine
            .dispatcher
            .dispatch(&self.name, arguments, options)
            .await
    }
}

/// Split a request value into its tool name and argument object
fn parse_request(request: &Value) -> Result<(String, Value), ToolUniverseError> {
    let name = request
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            ToolUniverseError::validation(
                "name",
                "request must carry a non-empty tool 'name'",
                vec![r#"Pass a request like {"name": "echo_tool", "arguments": {...}}"#.to_string()],
            )
        })?;
    let arguments = request.get("arguments").cloned().unwrap_or(Value::Null);
    Ok((name.to_string(), arguments))
}
