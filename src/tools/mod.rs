//! The tool capability interface.
//!
//! A tool is any type implementing [`Tool`]: one async `execute` method
//! taking an argument object and returning a JSON value. The declared
//! interface (name, description, parameter schema) lives in the
//! [`crate::spec::ToolSpec`] registered alongside the executable, so tool
//! implementations stay thin - most real tools are small HTTP wrappers
//! around one scientific data source.
//!
//! # Implementing a tool
//!
//! ```
//! use tooluniverse::tools::Tool;
//! use tooluniverse::error::ToolUniverseError;
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct ReverseTool;
//!
//! #[async_trait]
//! impl Tool for ReverseTool {
//!     async fn execute(&self, arguments: Value) -> Result<Value, ToolUniverseError> {
//!         let text = arguments["text"].as_str().unwrap_or_default();
//!         Ok(json!({"result": text.chars().rev().collect::<String>()}))
//!     }
//! }
//! ```

pub mod builtin;

use crate::error::ToolUniverseError;
use crate::spec::ToolSpec;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback receiving incremental output chunks during streaming execution
pub type StreamCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Single-method capability interface for all tool types.
///
/// Implementations must be `Send + Sync`; the dispatcher executes tools
/// concurrently from a bounded pool, and a single shared instance may serve
/// many calls.
#[async_trait]
pub trait Tool: Send + Sync + std::fmt::Debug {
    /// Execute the tool with a validated argument object.
    ///
    /// Errors returned here are tool-level failures; they are caught at the
    /// dispatcher boundary and converted into structured error results,
    /// never propagated to the caller as raw errors.
    async fn execute(&self, arguments: Value) -> Result<Value, ToolUniverseError>;

    /// Execute with incremental output observation.
    ///
    /// Tools that produce output incrementally forward each chunk to
    /// `on_chunk` as it arrives; the return value is still the fully
    /// assembled result. The default implementation ignores the callback
    /// and delegates to [`Tool::execute`].
    async fn execute_streaming(
        &self,
        arguments: Value,
        _on_chunk: StreamCallback,
    ) -> Result<Value, ToolUniverseError> {
        self.execute(arguments).await
    }

    /// Whether this tool emits incremental output through `execute_streaming`
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Whether this tool forwards execution to a remote server.
    ///
    /// Remote tools get transport-level retry and error classification in
    /// the dispatcher; local tools do not.
    fn is_remote(&self) -> bool {
        false
    }
}

/// Constructor signature for factory-built tools
pub type ToolConstructor =
    Arc<dyn Fn(&ToolSpec) -> Result<Arc<dyn Tool>, ToolUniverseError> + Send + Sync>;

/// Resolves a `tool_type` name from a JSON definition to an executable.
///
/// Definition files carry specs only; the factory supplies the matching
/// implementation when the registry ingests them. This replaces the
/// import-time decorator registration of the original design with explicit
/// construction owned by the engine.
#[derive(Clone, Default)]
pub struct ToolFactory {
    constructors: HashMap<String, ToolConstructor>,
}

impl ToolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory pre-populated with the built-in tool types
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        builtin::register_builtin_types(&mut factory);
        factory
    }

    /// Associate a tool type name with a constructor
    pub fn register_type<F>(&mut self, tool_type: impl Into<String>, constructor: F)
    where
        F: Fn(&ToolSpec) -> Result<Arc<dyn Tool>, ToolUniverseError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(tool_type.into(), Arc::new(constructor));
    }

    /// Construct an executable for the given spec
    pub fn build(&self, spec: &ToolSpec) -> Result<Arc<dyn Tool>, ToolUniverseError> {
        let constructor = self.constructors.get(&spec.tool_type).ok_or_else(|| {
            ToolUniverseError::configuration(format!(
                "no tool type '{}' registered for tool '{}'",
                spec.tool_type, spec.name
            ))
        })?;
        constructor(spec)
    }

    /// Whether a tool type is known to this factory
    pub fn knows(&self, tool_type: &str) -> bool {
        self.constructors.contains_key(tool_type)
    }
}

impl std::fmt::Debug for ToolFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolFactory")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
