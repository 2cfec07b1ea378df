//! Call dispatch: the execution path between `run()` and a tool body.
//!
//! Every call moves through a fixed lifecycle: lookup, validation,
//! bounded execution, post-processing. Failures at any stage become
//! structured error values rather than propagated errors, so the caller
//! always receives a JSON result it can inspect.
//!
//! Concurrency is bounded by a semaphore sized to the host's parallelism
//! by default; each execution also runs under a deadline. Remote tools
//! additionally get transport-level retry with exponential backoff, local
//! tools never do.

use crate::cache::ToolCache;
use crate::error::{retry_with_backoff, RetryConfig, ToolUniverseError};
use crate::hooks::HookPipeline;
use crate::registry::{RegisteredTool, ToolRegistry};
use crate::tools::StreamCallback;
use crate::validate;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Lifecycle stages of a dispatched call, surfaced in debug logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Pending,
    Validating,
    LocalExec,
    RemoteExec,
    Success,
    ToolError,
    TransportError,
    Hooked,
    Done,
}

/// Dispatcher behavior knobs
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum tool executions in flight at once
    pub max_concurrent: usize,
    /// Per-call execution deadline
    pub execution_timeout: Duration,
    /// Backoff schedule for remote transport failures
    pub retry: RetryConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get(),
            execution_timeout: Duration::from_secs(900),
            retry: RetryConfig::default(),
        }
    }
}

/// Per-call options
#[derive(Clone)]
pub struct CallOptions {
    /// Serve and store results through the cache
    pub use_cache: bool,
    /// Skip argument validation when false
    pub validate: bool,
    /// Observe incremental output; streaming results are never cached
    pub stream_callback: Option<StreamCallback>,
}

impl CallOptions {
    /// Validation on, caching off, no streaming
    pub fn new() -> Self {
        Self {
            use_cache: false,
            validate: true,
            stream_callback: None,
        }
    }

    pub fn with_cache(mut self) -> Self {
        self.use_cache = true;
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    pub fn with_stream(mut self, callback: StreamCallback) -> Self {
        self.stream_callback = Some(callback);
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOptions")
            .field("use_cache", &self.use_cache)
            .field("validate", &self.validate)
            .field("streaming", &self.stream_callback.is_some())
            .finish()
    }
}

/// Executes calls against the registry under concurrency and deadline
/// bounds, converting every failure into an error value.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
    cache: ToolCache,
    hooks: Arc<HookPipeline>,
    semaphore: Arc<Semaphore>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        cache: ToolCache,
        hooks: HookPipeline,
        config: DispatcherConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            registry,
            cache,
            hooks: Arc::new(hooks),
            semaphore,
            config,
        }
    }

    /// Dispatch one call. Always returns a JSON value: the tool's result,
    /// possibly hook-transformed, or a structured error value.
    pub async fn dispatch(&self, name: &str, arguments: Value, options: &CallOptions) -> Value {
        match self.try_dispatch(name, arguments, options).await {
            Ok(result) => result,
            Err(error) => {
                debug!("call '{}' failed: {}", name, error);
                error.to_error_value()
            }
        }
    }

    /// Dispatch a batch concurrently, preserving input order.
    ///
    /// Each element succeeds or fails independently; an invalid call in
    /// the middle yields an error value at its position without
    /// affecting its neighbors.
    pub async fn dispatch_batch(
        &self,
        calls: Vec<(String, Value)>,
        options: &CallOptions,
    ) -> Vec<Value> {
        let futures = calls
            .into_iter()
            .map(|(name, arguments)| async move {
                self.dispatch(&name, arguments, options).await
            })
            .collect::<Vec<_>>();
        join_all(futures).await
    }

    async fn try_dispatch(
        &self,
        name: &str,
        arguments: Value,
        options: &CallOptions,
    ) -> Result<Value, ToolUniverseError> {
        let mut state = CallState::Pending;
        debug!("call '{}' {:?}", name, state);

        let entry = self.registry.lookup(name).await?;

        state = CallState::Validating;
        debug!("call '{}' {:?}", name, state);
        let arguments = if options.validate {
            Value::Object(validate::validate(&entry.spec, &arguments)?)
        } else {
            arguments
        };

        let streaming = options.stream_callback.is_some();
        let output = if options.use_cache && !streaming {
            self.cache
                .get_or_compute(name, &arguments, || {
                    self.execute_and_hook(&entry, name, &arguments, options)
                })
                .await?
        } else {
            self.execute_and_hook(&entry, name, &arguments, options)
                .await?
        };

        state = CallState::Done;
        debug!("call '{}' {:?}", name, state);
        Ok(output)
    }

    /// Bounded execution followed by the hook pipeline
    async fn execute_and_hook(
        &self,
        entry: &RegisteredTool,
        name: &str,
        arguments: &Value,
        options: &CallOptions,
    ) -> Result<Value, ToolUniverseError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ToolUniverseError::execution("dispatcher shut down"))?;

        let mut state = if entry.tool.is_remote() {
            CallState::RemoteExec
        } else {
            CallState::LocalExec
        };
        debug!("call '{}' {:?}", name, state);

        let output = match self.execute(entry, name, arguments, options).await {
            Ok(output) => {
                state = CallState::Success;
                debug!("call '{}' {:?}", name, state);
                output
            }
            Err(error) => {
                state = match &error {
                    ToolUniverseError::Transport { .. } | ToolUniverseError::Timeout { .. } => {
                        CallState::TransportError
                    }
                    _ => CallState::ToolError,
                };
                debug!("call '{}' {:?}", name, state);
                return Err(error);
            }
        };

        if self.hooks.is_empty() {
            Ok(output)
        } else {
            state = CallState::Hooked;
            debug!("call '{}' {:?}", name, state);
            Ok(self.hooks.apply(name, output).await)
        }
    }

    async fn execute(
        &self,
        entry: &RegisteredTool,
        name: &str,
        arguments: &Value,
        options: &CallOptions,
    ) -> Result<Value, ToolUniverseError> {
        let timeout = self.config.execution_timeout;
        let deadline_ms = timeout.as_millis() as u64;
        let tool = entry.tool.clone();

        if let Some(callback) = &options.stream_callback {
            if !tool.supports_streaming() {
                warn!(
                    "tool '{}' does not stream; delivering the full result as one chunk",
                    name
                );
            }
            let callback = callback.clone();
            let arguments = arguments.clone();
            let execution = run_guarded(async move {
                tool.execute_streaming(arguments, callback).await
            });
            return tokio::time::timeout(timeout, execution)
                .await
                .map_err(|_| ToolUniverseError::timeout(deadline_ms))?;
        }

        if tool.is_remote() {
            // Transient transport failures retry; tool-level errors do not
            let execution = retry_with_backoff(
                || {
                    let tool = tool.clone();
                    let arguments = arguments.clone();
                    run_guarded(async move { tool.execute(arguments).await })
                },
                Some(self.config.retry.clone()),
            );
            return tokio::time::timeout(timeout, execution)
                .await
                .map_err(|_| ToolUniverseError::timeout(deadline_ms))?;
        }

        let arguments = arguments.clone();
        let execution = run_guarded(async move { tool.execute(arguments).await });
        tokio::time::timeout(timeout, execution)
            .await
            .map_err(|_| ToolUniverseError::timeout(deadline_ms))?
    }
}

/// Run a tool future on its own task so a panicking tool body becomes an
/// execution error instead of tearing down the caller.
async fn run_guarded<F>(future: F) -> Result<Value, ToolUniverseError>
where
    F: std::future::Future<Output = Result<Value, ToolUniverseError>> + Send + 'static,
{
    match tokio::spawn(future).await {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => {
            Err(ToolUniverseError::execution("tool panicked during execution"))
        }
        Err(join_error) => Err(ToolUniverseError::execution(format!(
            "tool task failed: {}",
            join_error
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ParamType, ParameterSchema, PropertySpec, ToolSpec};
    use crate::tools::builtin::EchoTool;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn dispatcher_with(registry: ToolRegistry) -> Dispatcher {
        Dispatcher::new(
            registry,
            ToolCache::new(),
            HookPipeline::new(),
            DispatcherConfig::default(),
        )
    }

    async fn echo_registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry
            .register(EchoTool::spec(), Arc::new(EchoTool::new()))
            .await;
        registry
    }

    /// Counts executions; used to observe side effects
    #[derive(Debug)]
    struct CountingTool {
        calls: AtomicU32,
        remote: bool,
        fail_times: AtomicU32,
    }

    impl CountingTool {
        fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                remote: false,
                fail_times: AtomicU32::new(0),
            }
        }

        fn remote_failing(times: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                remote: true,
                fail_times: AtomicU32::new(times),
            }
        }

        fn spec() -> ToolSpec {
            ToolSpec::new("counting_tool", "CountingTool").with_parameters(
                ParameterSchema::empty()
                    .property("text", PropertySpec::new(ParamType::String))
                    .require("text"),
            )
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        async fn execute(&self, arguments: Value) -> Result<Value, ToolUniverseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(ToolUniverseError::transport("connection reset"));
            }
            Ok(json!({"echo": arguments["text"]}))
        }

        fn is_remote(&self) -> bool {
            self.remote
        }
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let dispatcher = dispatcher_with(echo_registry().await);
        let result = dispatcher
            .dispatch("echo_tool", json!({"text": "hi"}), &CallOptions::new())
            .await;
        assert_eq!(result["result"], "hi");
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_error_value() {
        let dispatcher = dispatcher_with(echo_registry().await);
        let result = dispatcher
            .dispatch("echo_tol", json!({"text": "hi"}), &CallOptions::new())
            .await;

        assert_eq!(result["error_details"]["type"], "ToolNotFoundError");
        let steps = result["error_details"]["next_steps"].as_array().unwrap();
        assert!(steps.iter().any(|s| s.as_str().unwrap().contains("echo_tool")));
    }

    #[tokio::test]
    async fn test_default_options_keep_validation_on() {
        let defaults = CallOptions::default();
        assert!(defaults.validate);
        assert!(!defaults.use_cache);
        assert!(defaults.stream_callback.is_none());

        let registry = ToolRegistry::new();
        let tool = Arc::new(CountingTool::new());
        registry.register(CountingTool::spec(), tool.clone()).await;
        let dispatcher = dispatcher_with(registry);

        let result = dispatcher
            .dispatch("counting_tool", json!({}), &CallOptions::default())
            .await;

        assert_eq!(result["error_details"]["type"], "ToolValidationError");
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_prevents_execution() {
        let registry = ToolRegistry::new();
        let tool = Arc::new(CountingTool::new());
        registry.register(CountingTool::spec(), tool.clone()).await;
        let dispatcher = dispatcher_with(registry);

        let result = dispatcher
            .dispatch("counting_tool", json!({}), &CallOptions::new())
            .await;

        assert_eq!(result["error_details"]["type"], "ToolValidationError");
        // The tool body never ran
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_suppresses_second_execution() {
        let registry = ToolRegistry::new();
        let tool = Arc::new(CountingTool::new());
        registry.register(CountingTool::spec(), tool.clone()).await;
        let dispatcher = dispatcher_with(registry);

        let options = CallOptions::new().with_cache();
        let first = dispatcher
            .dispatch("counting_tool", json!({"text": "x"}), &options)
            .await;
        let second = dispatcher
            .dispatch("counting_tool", json!({"text": "x"}), &options)
            .await;

        assert_eq!(first, second);
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_transport_failure_retries() {
        let registry = ToolRegistry::new();
        let tool = Arc::new(CountingTool::remote_failing(1));
        registry.register(CountingTool::spec(), tool.clone()).await;

        let config = DispatcherConfig {
            retry: RetryConfig {
                max_retries: 2,
                base_delay_ms: 1,
                exponential_backoff: false,
                max_delay_ms: 2,
                jitter_factor: 0.0,
            },
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(registry, ToolCache::new(), HookPipeline::new(), config);

        let result = dispatcher
            .dispatch("counting_tool", json!({"text": "x"}), &CallOptions::new())
            .await;

        assert_eq!(result["echo"], "x");
        assert_eq!(tool.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let dispatcher = dispatcher_with(echo_registry().await);

        let results = dispatcher
            .dispatch_batch(
                vec![
                    ("echo_tool".to_string(), json!({"text": "a"})),
                    ("echo_tool".to_string(), json!({})),
                    ("echo_tool".to_string(), json!({"text": "c"})),
                ],
                &CallOptions::new(),
            )
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["result"], "a");
        assert_eq!(results[1]["error_details"]["type"], "ToolValidationError");
        assert_eq!(results[2]["result"], "c");
    }

    #[tokio::test]
    async fn test_streaming_dispatch_forwards_chunks() {
        let dispatcher = dispatcher_with(echo_registry().await);

        let seen = Arc::new(Mutex::new(String::new()));
        let seen_clone = seen.clone();
        let callback: StreamCallback = Arc::new(move |chunk| {
            seen_clone.lock().unwrap().push_str(chunk);
        });

        let result = dispatcher
            .dispatch(
                "echo_tool",
                json!({"text": "streamed words here"}),
                &CallOptions::new().with_stream(callback),
            )
            .await;

        assert_eq!(result["result"], "streamed words here");
        assert_eq!(&*seen.lock().unwrap(), "streamed words here");
    }

    #[tokio::test]
    async fn test_panicking_tool_becomes_execution_error() {
        #[derive(Debug)]
        struct PanickingTool;

        #[async_trait]
        impl Tool for PanickingTool {
            async fn execute(&self, _arguments: Value) -> Result<Value, ToolUniverseError> {
                panic!("tool bug");
            }
        }

        let registry = ToolRegistry::new();
        registry
            .register(
                ToolSpec::new("panicking_tool", "PanickingTool"),
                Arc::new(PanickingTool),
            )
            .await;
        let dispatcher = dispatcher_with(registry);

        let result = dispatcher
            .dispatch("panicking_tool", json!({}), &CallOptions::new())
            .await;
        assert_eq!(result["error_details"]["type"], "ToolExecutionError");
    }

    #[tokio::test]
    async fn test_execution_timeout_classified_as_transport() {
        #[derive(Debug)]
        struct SlowTool;

        #[async_trait]
        impl Tool for SlowTool {
            async fn execute(&self, _arguments: Value) -> Result<Value, ToolUniverseError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(json!({}))
            }
        }

        let registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("slow_tool", "SlowTool"), Arc::new(SlowTool))
            .await;

        let config = DispatcherConfig {
            execution_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(registry, ToolCache::new(), HookPipeline::new(), config);

        let result = dispatcher
            .dispatch("slow_tool", json!({}), &CallOptions::new())
            .await;
        assert_eq!(result["error_details"]["type"], "TransportError");
    }
}
