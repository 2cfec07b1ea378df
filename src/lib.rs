//! ToolUniverse: a registry and dispatch engine for schema-described
//! scientific data-access tools.
//!
//! Hundreds of tools, each a thin wrapper over a scientific data source
//! or computation, sit behind one uniform call interface. A caller names
//! a tool and passes a JSON argument object; the engine validates the
//! arguments against the tool's declared schema, executes under
//! concurrency and deadline bounds, post-processes oversized outputs,
//! and returns a JSON result. Failures come back as structured error
//! values, never as panics or opaque strings.
//!
//! # Quick start
//!
//! ```no_run
//! use tooluniverse::ToolUniverse;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tooluniverse::error::ToolUniverseError> {
//!     let engine = ToolUniverse::builder()
//!         .tool_file("configs/builtin_tools.json")
//!         .build()
//!         .await?;
//!
//!     let result = engine
//!         .run(json!({"name": "echo_tool", "arguments": {"text": "hello"}}))
//!         .await?;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! run({"name", "arguments"})
//!         │
//!         ▼
//!   ToolRegistry ──── lookup, "did you mean" suggestions
//!         │
//!         ▼
//!    Validation ──── coercion, defaults, required checks
//!         │
//!         ▼
//!    Dispatcher ──── semaphore bound, timeout, remote retry
//!     │       │
//!   local   remote (MCP proxy)
//!     │       │
//!     ▼       ▼
//!   HookPipeline ── summarization, file save
//!         │
//!         ▼
//!     ToolCache ──── keyed by (name, canonical arguments)
//! ```
//!
//! # Key modules
//!
//! - [`engine`] - the [`ToolUniverse`] façade and its builder
//! - [`spec`] - declarative tool interface descriptions
//! - [`registry`] - the name-to-tool index
//! - [`validate`] - argument checking and coercion
//! - [`dispatch`] - bounded concurrent execution
//! - [`hooks`] - output post-processing pipeline
//! - [`cache`] - result caching
//! - [`mcp`] - remote tools over the Model Context Protocol
//! - [`tools`] - the [`Tool`] trait and built-in implementations
//! - [`error`] - the error taxonomy and retry helpers

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod mcp;
pub mod registry;
pub mod spec;
pub mod tools;
pub mod validate;

pub use cache::ToolCache;
pub use config::EngineConfig;
pub use dispatch::{CallOptions, Dispatcher, DispatcherConfig};
pub use engine::{ToolHandle, ToolUniverse, ToolUniverseBuilder};
pub use error::ToolUniverseError;
pub use hooks::{HookPipeline, HookRule};
pub use registry::ToolRegistry;
pub use spec::{ParamType, ParameterSchema, PropertySpec, ToolSpec};
pub use tools::{StreamCallback, Tool, ToolFactory};

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, ToolUniverseError>;

/// Install a global tracing subscriber honoring `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
