//! Engine configuration.
//!
//! Configuration merges three layers, lowest precedence first: built-in
//! defaults, an optional JSON file, and environment variable overrides.
//!
//! ```json
//! {
//!     "tool_files": ["configs/builtin_tools.json"],
//!     "max_concurrent": 8,
//!     "execution_timeout_secs": 900,
//!     "hooks_enabled": true,
//!     "hook_config": {
//!         "hooks": [
//!             {"name": "summarize", "type": "SummarizationHook",
//!              "conditions": {"output_length": {"operator": ">", "threshold": 5000}}}
//!         ]
//!     }
//! }
//! ```
//!
//! Recognized environment variables: `TOOLUNIVERSE_MAX_CONCURRENT`,
//! `TOOLUNIVERSE_EXECUTION_TIMEOUT_SECS`, `TOOLUNIVERSE_HOOKS_ENABLED`.

use crate::error::ToolUniverseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tool definition files loaded at startup
    #[serde(default)]
    pub tool_files: Vec<PathBuf>,
    /// Maximum tool executions in flight; defaults to host parallelism
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Per-call execution deadline in seconds
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,
    /// Whether the hook pipeline runs at all
    #[serde(default)]
    pub hooks_enabled: bool,
    /// Declarative hook pipeline configuration, `{"hooks": [...]}`
    #[serde(default)]
    pub hook_config: Value,
}

fn default_max_concurrent() -> usize {
    num_cpus::get()
}

fn default_execution_timeout_secs() -> u64 {
    900
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tool_files: Vec::new(),
            max_concurrent: default_max_concurrent(),
            execution_timeout_secs: default_execution_timeout_secs(),
            hooks_enabled: false,
            hook_config: Value::Null,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ToolUniverseError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ToolUniverseError::configuration(format!(
                "cannot read config {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut config: Self = serde_json::from_str(&contents).map_err(|e| {
            ToolUniverseError::configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = read_env_parsed::<usize>("TOOLUNIVERSE_MAX_CONCURRENT") {
            self.max_concurrent = value;
        }
        if let Some(value) = read_env_parsed::<u64>("TOOLUNIVERSE_EXECUTION_TIMEOUT_SECS") {
            self.execution_timeout_secs = value;
        }
        if let Some(value) = read_env_parsed::<bool>("TOOLUNIVERSE_HOOKS_ENABLED") {
            self.hooks_enabled = value;
        }
    }
}

fn read_env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring unparsable {}={}", name, raw);
            None
        }
    }
}
