//! Output summarization hook.
//!
//! Compresses oversized tool outputs into a short digest, replacing the
//! raw value with `{"summary": ..., "original_length": ...}`. The
//! summarization backend is pluggable through the [`Summarizer`] trait;
//! the default backend is a local head/tail extractor that needs no
//! network access.

use crate::error::ToolUniverseError;
use crate::hooks::{output_length, Hook};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Pluggable summarization backend
#[async_trait]
pub trait Summarizer: Send + Sync + std::fmt::Debug {
    async fn summarize(&self, text: &str, max_chars: usize) -> Result<String, ToolUniverseError>;
}

/// Local extractive backend: keeps the head and tail of the text with an
/// elision marker between them. Deterministic and dependency-free, which
/// keeps the default pipeline usable offline.
#[derive(Debug, Default)]
pub struct HeadTailSummarizer;

#[async_trait]
impl Summarizer for HeadTailSummarizer {
    async fn summarize(&self, text: &str, max_chars: usize) -> Result<String, ToolUniverseError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= max_chars {
            return Ok(text.to_string());
        }

        const MARKER: &str = " ... [truncated] ... ";
        let keep = max_chars.saturating_sub(MARKER.chars().count()).max(2);
        let head: String = chars[..keep / 2].iter().collect();
        let tail: String = chars[chars.len() - (keep - keep / 2)..].iter().collect();
        Ok(format!("{}{}{}", head, MARKER, tail))
    }
}

/// Hook replacing long outputs with a summary record
#[derive(Debug)]
pub struct SummarizationHook {
    summarizer: Arc<dyn Summarizer>,
    max_summary_chars: usize,
}

impl SummarizationHook {
    pub const DEFAULT_MAX_SUMMARY_CHARS: usize = 1000;

    /// Build from a rule's `hook_config` object
    pub fn from_config(config: &Value) -> Self {
        let max_summary_chars = config
            .get("max_summary_chars")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(Self::DEFAULT_MAX_SUMMARY_CHARS);
        Self {
            summarizer: Arc::new(HeadTailSummarizer),
            max_summary_chars,
        }
    }

    /// Swap in a different summarization backend
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }
}

#[async_trait]
impl Hook for SummarizationHook {
    async fn apply(&self, output: &Value) -> Result<Value, ToolUniverseError> {
        let original_length = output_length(output);
        let text = match output {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other)?,
        };

        let summary = self
            .summarizer
            .summarize(&text, self.max_summary_chars)
            .await?;

        Ok(json!({
            "summary": summary,
            "original_length": original_length,
        }))
    }
}
