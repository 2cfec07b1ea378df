//! Post-processing hook pipeline.
//!
//! Hooks transform successful tool outputs after execution: compressing
//! oversized results, saving them to disk, and similar concerns the tool
//! itself should not know about. Each hook carries a rule deciding when it
//! fires; the common trigger is output length crossing a threshold.
//!
//! The pipeline is configured declaratively:
//!
//! ```json
//! {
//!     "hooks": [
//!         {
//!             "name": "summarize_long_outputs",
//!             "type": "SummarizationHook",
//!             "enabled": true,
//!             "conditions": {
//!                 "output_length": {"operator": ">", "threshold": 5000}
//!             },
//!             "hook_config": {"max_summary_chars": 1000}
//!         }
//!     ]
//! }
//! ```
//!
//! Hooks apply in declared order, each seeing the previous hook's output.
//! A failing hook logs a warning and passes its input through unchanged;
//! the call still succeeds with the last good value.

pub mod file_save;
pub mod summarize;

use crate::error::ToolUniverseError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Comparison operators usable in hook trigger conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl ComparisonOp {
    pub fn evaluate(&self, lhs: u64, rhs: u64) -> bool {
        match self {
            ComparisonOp::Greater => lhs > rhs,
            ComparisonOp::GreaterOrEqual => lhs >= rhs,
            ComparisonOp::Less => lhs < rhs,
            ComparisonOp::LessOrEqual => lhs <= rhs,
            ComparisonOp::Equal => lhs == rhs,
            ComparisonOp::NotEqual => lhs != rhs,
        }
    }
}

/// A single metric condition, e.g. `{"operator": ">", "threshold": 5000}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricCondition {
    pub operator: ComparisonOp,
    pub threshold: u64,
}

/// Trigger conditions for a hook rule.
///
/// An empty conditions object means the hook fires on every successful
/// output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_length: Option<MetricCondition>,
}

impl HookConditions {
    /// Whether the hook should fire for this output
    pub fn triggered(&self, output: &Value) -> bool {
        match &self.output_length {
            Some(condition) => condition
                .operator
                .evaluate(output_length(output), condition.threshold),
            None => true,
        }
    }
}

/// Length metric used by trigger conditions: character count of the
/// output as a string, or of its JSON rendering for structured values.
pub fn output_length(output: &Value) -> u64 {
    match output {
        Value::String(s) => s.chars().count() as u64,
        other => serde_json::to_string(other)
            .map(|s| s.chars().count() as u64)
            .unwrap_or(0),
    }
}

/// Declarative configuration for one hook in the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookRule {
    pub name: String,
    #[serde(rename = "type")]
    pub hook_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: HookConditions,
    #[serde(default)]
    pub hook_config: Value,
}

fn default_enabled() -> bool {
    true
}

/// A post-processing transformation over a successful tool output
#[async_trait]
pub trait Hook: Send + Sync + std::fmt::Debug {
    /// Transform the output. Errors degrade gracefully: the pipeline keeps
    /// the input value and logs the failure.
    async fn apply(&self, output: &Value) -> Result<Value, ToolUniverseError>;
}

/// Build a hook implementation for a rule's declared type
fn build_hook(rule: &HookRule) -> Result<Arc<dyn Hook>, ToolUniverseError> {
    match rule.hook_type.as_str() {
        "SummarizationHook" => Ok(Arc::new(summarize::SummarizationHook::from_config(
            &rule.hook_config,
        ))),
        "FileSaveHook" => Ok(Arc::new(file_save::FileSaveHook::from_config(
            &rule.hook_config,
        )?)),
        other => Err(ToolUniverseError::configuration(format!(
            "unknown hook type '{}' for hook '{}'",
            other, rule.name
        ))),
    }
}

/// Output length above which the default pipeline summarizes
pub const DEFAULT_SUMMARY_THRESHOLD: u64 = 5000;

/// Ordered pipeline of configured hooks
#[derive(Debug, Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<(HookRule, Arc<dyn Hook>)>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pipeline installed when hooks are enabled without explicit
    /// configuration: one summarization hook for outputs longer than
    /// [`DEFAULT_SUMMARY_THRESHOLD`] characters.
    pub fn with_defaults() -> Self {
        let rule = HookRule {
            name: "summarize_long_outputs".to_string(),
            hook_type: "SummarizationHook".to_string(),
            enabled: true,
            conditions: HookConditions {
                output_length: Some(MetricCondition {
                    operator: ComparisonOp::Greater,
                    threshold: DEFAULT_SUMMARY_THRESHOLD,
                }),
            },
            hook_config: Value::Null,
        };
        let hook = summarize::SummarizationHook::from_config(&Value::Null);
        let mut pipeline = Self::new();
        pipeline.hooks.push((rule, Arc::new(hook)));
        pipeline
    }

    /// Parse a `{"hooks": [...]}` configuration object
    pub fn from_config(config: &Value) -> Result<Self, ToolUniverseError> {
        let rules: Vec<HookRule> = match config.get("hooks") {
            Some(list) => serde_json::from_value(list.clone()).map_err(|e| {
                ToolUniverseError::configuration(format!("invalid hook configuration: {}", e))
            })?,
            None => Vec::new(),
        };

        let mut pipeline = Self::new();
        for rule in rules {
            let hook = build_hook(&rule)?;
            pipeline.hooks.push((rule, hook));
        }
        Ok(pipeline)
    }

    /// Add a hook programmatically, appended after configured hooks
    pub fn push(&mut self, rule: HookRule, hook: Arc<dyn Hook>) {
        self.hooks.push((rule, hook));
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Apply every enabled, triggered hook in declared order.
    ///
    /// Conditions are evaluated against the current value at each stage,
    /// so an early hook shrinking the output can stop later ones from
    /// firing.
    pub async fn apply(&self, tool_name: &str, output: Value) -> Value {
        let mut current = output;
        for (rule, hook) in &self.hooks {
            if !rule.enabled || !rule.conditions.triggered(&current) {
                continue;
            }
            debug!("applying hook '{}' to '{}' output", rule.name, tool_name);
            match hook.apply(&current).await {
                Ok(transformed) => current = transformed,
                Err(error) => {
                    warn!(
                        "hook '{}' failed on '{}' output, keeping previous value: {}",
                        rule.name, tool_name, error
                    );
                }
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct TagHook(&'static str);

    #[async_trait]
    impl Hook for TagHook {
        async fn apply(&self, output: &Value) -> Result<Value, ToolUniverseError> {
            let mut tags = output
                .get("tags")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            tags.push(json!(self.0));
            Ok(json!({"tags": tags}))
        }
    }

    #[derive(Debug)]
    struct FailingHook;

    #[async_trait]
    impl Hook for FailingHook {
        async fn apply(&self, _output: &Value) -> Result<Value, ToolUniverseError> {
            Err(ToolUniverseError::hook("failing", "backend unavailable"))
        }
    }

    fn rule(name: &str, conditions: HookConditions) -> HookRule {
        HookRule {
            name: name.to_string(),
            hook_type: "test".to_string(),
            enabled: true,
            conditions,
            hook_config: Value::Null,
        }
    }

    fn length_condition(operator: ComparisonOp, threshold: u64) -> HookConditions {
        HookConditions {
            output_length: Some(MetricCondition {
                operator,
                threshold,
            }),
        }
    }

    #[test]
    fn test_operator_evaluation() {
        assert!(ComparisonOp::Greater.evaluate(10, 5));
        assert!(!ComparisonOp::Greater.evaluate(5, 5));
        assert!(ComparisonOp::GreaterOrEqual.evaluate(5, 5));
        assert!(ComparisonOp::NotEqual.evaluate(1, 2));
    }

    #[test]
    fn test_output_length_metric() {
        assert_eq!(output_length(&json!("hello")), 5);
        // Structured values measure their JSON rendering
        assert_eq!(output_length(&json!({"a": 1})), 7);
    }

    #[test]
    fn test_parse_hook_config() {
        let config = json!({
            "hooks": [{
                "name": "summarize_long_outputs",
                "type": "SummarizationHook",
                "enabled": true,
                "conditions": {
                    "output_length": {"operator": ">", "threshold": 5000}
                },
                "hook_config": {"max_summary_chars": 500}
            }]
        });
        let pipeline = HookPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.len(), 1);
    }

    #[tokio::test]
    async fn test_default_pipeline_summarizes_above_threshold() {
        let pipeline = HookPipeline::with_defaults();
        assert_eq!(pipeline.len(), 1);

        let small = pipeline.apply("t", json!("short output")).await;
        assert_eq!(small, json!("short output"));

        let long = pipeline.apply("t", json!("x".repeat(6000))).await;
        assert_eq!(long["original_length"], 6000);
        assert!(long["summary"].is_string());
    }

    #[test]
    fn test_unknown_hook_type_rejected() {
        let config = json!({"hooks": [{"name": "x", "type": "TeleportHook"}]});
        assert!(HookPipeline::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_hooks_apply_in_declared_order() {
        let mut pipeline = HookPipeline::new();
        pipeline.push(rule("first", HookConditions::default()), Arc::new(TagHook("first")));
        pipeline.push(rule("second", HookConditions::default()), Arc::new(TagHook("second")));

        let result = pipeline.apply("t", json!({})).await;
        assert_eq!(result["tags"], json!(["first", "second"]));
    }

    #[tokio::test]
    async fn test_disabled_hook_skipped() {
        let mut pipeline = HookPipeline::new();
        let mut disabled = rule("off", HookConditions::default());
        disabled.enabled = false;
        pipeline.push(disabled, Arc::new(TagHook("off")));

        let result = pipeline.apply("t", json!({"ok": true})).await;
        assert_eq!(result, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_condition_gates_application() {
        let mut pipeline = HookPipeline::new();
        pipeline.push(
            rule("big_only", length_condition(ComparisonOp::Greater, 100)),
            Arc::new(TagHook("fired")),
        );

        let small = pipeline.apply("t", json!("tiny")).await;
        assert_eq!(small, json!("tiny"));

        let big_payload = json!("x".repeat(200));
        let big = pipeline.apply("t", big_payload).await;
        assert_eq!(big["tags"], json!(["fired"]));
    }

    #[tokio::test]
    async fn test_failing_hook_degrades_gracefully() {
        let mut pipeline = HookPipeline::new();
        pipeline.push(rule("boom", HookConditions::default()), Arc::new(FailingHook));
        pipeline.push(rule("after", HookConditions::default()), Arc::new(TagHook("after")));

        let result = pipeline.apply("t", json!({"data": 1})).await;
        // Failure kept the original, the next hook still ran
        assert_eq!(result["tags"], json!(["after"]));
    }
}
