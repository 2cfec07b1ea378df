//! Error handling for the ToolUniverse engine.
//!
//! The engine converts every recoverable failure into a dual-format error
//! value before it reaches the caller: a plain top-level `error` string for
//! naive callers plus a nested `error_details` object (`type`, `message`,
//! `next_steps`) for structured callers. Nothing escapes `run()` as a raw
//! Rust error except interface misuse (a malformed request value).
//!
//! # Error categories
//!
//! - **ToolNotFound** - requested name absent from the registry; carries
//!   "did you mean" candidates when a near match exists
//! - **Validation** - argument shape/type/required-field violations, raised
//!   before any execution side effect
//! - **Execution** - the tool's own logic failed; never retried
//! - **Transport** - network/connection/timeout reaching a remote tool;
//!   retryable with backoff
//! - **Hook** - a post-processing hook failed; the pipeline degrades
//!   gracefully instead of failing the call
//!
//! # Retry support
//!
//! Transport-level failures may be retried with [`retry_with_backoff`]:
//! ```no_run
//! use tooluniverse::error::{ToolUniverseError, RetryConfig, retry_with_backoff};
//!
//! # async fn example() -> Result<(), ToolUniverseError> {
//! let config = RetryConfig { max_retries: 3, ..Default::default() };
//! let result = retry_with_backoff(|| async {
//!     ping_remote_server().await
//! }, Some(config)).await?;
//! # Ok(())
//! # }
//! # async fn ping_remote_server() -> Result<String, ToolUniverseError> { Ok("ok".into()) }
//! ```

use serde_json::{json, Value};
use thiserror::Error;

/// Main error type for the ToolUniverse engine
#[derive(Error, Debug, Clone)]
pub enum ToolUniverseError {
    /// Requested tool name is not present in the registry
    #[error("Tool not found: {name}")]
    ToolNotFound {
        name: String,
        /// Near-match candidates from the registry index
        suggestions: Vec<String>,
    },

    /// Argument validation failed before execution
    #[error("Validation error for '{field}': {message}")]
    Validation {
        message: String,
        /// The violating field
        field: String,
        /// Remediation hints for the caller
        next_steps: Vec<String>,
    },

    /// The tool's own logic raised or returned a failure
    #[error("Tool execution failed: {message}")]
    Execution { message: String },

    /// Network/connection/timeout failure reaching a remote tool
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// A post-processing hook failed internally
    #[error("Hook '{hook}' failed: {message}")]
    Hook { hook: String, message: String },

    /// Engine or tool configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// JSON serialization/deserialization failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Operation exceeded its deadline
    #[error("Timeout error: operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl ToolUniverseError {
    /// Create a ToolNotFound error without suggestions
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound {
            name: name.into(),
            suggestions: Vec::new(),
        }
    }

    /// Create a ToolNotFound error with "did you mean" candidates
    pub fn tool_not_found_with_suggestions(
        name: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::ToolNotFound {
            name: name.into(),
            suggestions,
        }
    }

    /// Create a Validation error
    pub fn validation(
        field: impl Into<String>,
        message: impl Into<String>,
        next_steps: Vec<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.into(),
            next_steps,
        }
    }

    /// Create an Execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Create a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a Hook error
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Create a Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a Timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Check if this error is retryable.
    ///
    /// Only transport-level failures are retried; tool-level logical errors
    /// (e.g. "disease not found") never are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolUniverseError::Transport { .. } | ToolUniverseError::Timeout { .. }
        )
    }

    /// The error taxonomy name surfaced in `error_details.type`
    pub fn kind(&self) -> &'static str {
        match self {
            ToolUniverseError::ToolNotFound { .. } => "ToolNotFoundError",
            ToolUniverseError::Validation { .. } => "ToolValidationError",
            ToolUniverseError::Execution { .. } => "ToolExecutionError",
            ToolUniverseError::Transport { .. } => "TransportError",
            ToolUniverseError::Hook { .. } => "HookError",
            ToolUniverseError::Configuration { .. } => "ConfigurationError",
            ToolUniverseError::Serialization { .. } => "SerializationError",
            ToolUniverseError::Timeout { .. } => "TransportError",
        }
    }

    /// Remediation hints carried alongside the message
    pub fn next_steps(&self) -> Vec<String> {
        match self {
            ToolUniverseError::ToolNotFound { suggestions, .. } => {
                let mut steps = vec!["Check the tool name against list_tools() output".to_string()];
                for s in suggestions {
                    steps.push(format!("Did you mean '{}'?", s));
                }
                steps
            }
            ToolUniverseError::Validation { next_steps, .. } => next_steps.clone(),
            ToolUniverseError::Transport { .. } | ToolUniverseError::Timeout { .. } => vec![
                "Verify the remote server is running and reachable".to_string(),
                "Check the configured server_url and transport settings".to_string(),
                "Consider increasing the call timeout".to_string(),
            ],
            ToolUniverseError::Execution { .. } => {
                vec!["Inspect the tool's error message; the upstream source may have rejected the request".to_string()]
            }
            _ => Vec::new(),
        }
    }

    /// Convert into the dual-format error result returned from `run()`.
    ///
    /// Both the flat `error` string and the structured `error_details`
    /// describe the same failure, never divergent content.
    pub fn to_error_value(&self) -> Value {
        json!({
            "error": self.to_string(),
            "error_details": {
                "type": self.kind(),
                "message": self.to_string(),
                "next_steps": self.next_steps(),
            }
        })
    }
}

impl From<serde_json::Error> for ToolUniverseError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for ToolUniverseError {
    fn from(err: std::io::Error) -> Self {
        Self::configuration(err.to_string())
    }
}

/// Retry configuration for transport-level error recovery
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,
    /// Whether to use exponential backoff
    pub exponential_backoff: bool,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0) to add randomness to delays
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            exponential_backoff: true,
            max_delay_ms: 10_000,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Calculate the delay for a specific retry attempt
    pub fn calculate_delay(&self, attempt: u32) -> u64 {
        let delay = if self.exponential_backoff && attempt > 0 {
            let exponential_delay = self.base_delay_ms.saturating_mul(2_u64.pow(attempt - 1));
            exponential_delay.min(self.max_delay_ms)
        } else {
            self.base_delay_ms
        };

        // Jitter prevents thundering herd against a recovering server
        if self.jitter_factor > 0.0 {
            let jitter = (delay as f64 * self.jitter_factor * fastrand::f64()).round() as u64;
            delay + jitter
        } else {
            delay
        }
    }
}

/// Retry an operation, backing off between attempts.
///
/// Non-retryable errors (validation, tool-level failures) return
/// immediately on the first attempt.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    custom_config: Option<RetryConfig>,
) -> Result<T, ToolUniverseError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ToolUniverseError>>,
{
    let config = custom_config.unwrap_or_default();
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if !error.is_retryable() || attempt >= config.max_retries {
                    return Err(error);
                }

                let delay_ms = config.calculate_delay(attempt + 1);
                tracing::debug!(
                    "Retrying after {} (attempt {}/{}, delay {}ms)",
                    error,
                    attempt + 1,
                    config.max_retries,
                    delay_ms
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;

                attempt += 1;
            }
        }
    }
}
