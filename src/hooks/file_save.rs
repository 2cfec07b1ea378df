//! File save hook.
//!
//! Writes the tool output to a uniquely named file and replaces the
//! in-band result with a pointer record:
//!
//! ```json
//! {"file_path": "/tmp/tooluniverse/result_3f2a....json",
//!  "data_format": "json",
//!  "file_size": 18234}
//! ```
//!
//! Structured outputs are written as pretty-printed JSON, plain strings as
//! text. The write is fully flushed before the pointer is returned, so a
//! caller reading `file_path` immediately sees complete data.

use crate::error::ToolUniverseError;
use crate::hooks::Hook;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

#[derive(Debug)]
pub struct FileSaveHook {
    directory: PathBuf,
    file_prefix: String,
}

impl FileSaveHook {
    /// Build from a rule's `hook_config` object.
    ///
    /// Recognized keys: `temp_dir` (default: the system temp directory
    /// plus `tooluniverse/`) and `file_prefix` (default `"result"`).
    pub fn from_config(config: &Value) -> Result<Self, ToolUniverseError> {
        let directory = config
            .get("temp_dir")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("tooluniverse"));
        let file_prefix = config
            .get("file_prefix")
            .and_then(Value::as_str)
            .unwrap_or("result")
            .to_string();
        Ok(Self {
            directory,
            file_prefix,
        })
    }
}

#[async_trait]
impl Hook for FileSaveHook {
    async fn apply(&self, output: &Value) -> Result<Value, ToolUniverseError> {
        let (contents, data_format) = match output {
            Value::String(s) => (s.clone(), "txt"),
            other => (serde_json::to_string_pretty(other)?, "json"),
        };

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| {
                ToolUniverseError::hook(
                    "file_save",
                    format!("creating {}: {}", self.directory.display(), e),
                )
            })?;

        let file_name = format!("{}_{}.{}", self.file_prefix, Uuid::new_v4(), data_format);
        let path = self.directory.join(file_name);

        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            ToolUniverseError::hook("file_save", format!("creating {}: {}", path.display(), e))
        })?;
        file.write_all(contents.as_bytes()).await.map_err(|e| {
            ToolUniverseError::hook("file_save", format!("writing {}: {}", path.display(), e))
        })?;
        file.flush().await.map_err(|e| {
            ToolUniverseError::hook("file_save", format!("flushing {}: {}", path.display(), e))
        })?;

        Ok(json!({
            "file_path": path.to_string_lossy(),
            "data_format": data_format,
            "file_size": contents.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_output_saved_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let hook = FileSaveHook::from_config(&json!({
            "temp_dir": dir.path().to_string_lossy(),
            "file_prefix": "run"
        }))
        .unwrap();

        let output = json!({"hits": ["TP53"], "total": 1});
        let pointer = hook.apply(&output).await.unwrap();

        assert_eq!(pointer["data_format"], "json");
        let path = pointer["file_path"].as_str().unwrap();
        assert!(path.contains("run_"));

        let written = tokio::fs::read_to_string(path).await.unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&written).unwrap(),
            output
        );
        assert_eq!(pointer["file_size"].as_u64().unwrap(), written.len() as u64);
    }

    #[tokio::test]
    async fn test_string_output_saved_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let hook = FileSaveHook::from_config(&json!({
            "temp_dir": dir.path().to_string_lossy()
        }))
        .unwrap();

        let pointer = hook.apply(&json!("plain report text")).await.unwrap();
        assert_eq!(pointer["data_format"], "txt");

        let path = pointer["file_path"].as_str().unwrap();
        assert!(path.ends_with(".txt"));
        let written = tokio::fs::read_to_string(path).await.unwrap();
        assert_eq!(written, "plain report text");
    }

    #[tokio::test]
    async fn test_distinct_files_per_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let hook = FileSaveHook::from_config(&json!({
            "temp_dir": dir.path().to_string_lossy()
        }))
        .unwrap();

        let first = hook.apply(&json!({"n": 1})).await.unwrap();
        let second = hook.apply(&json!({"n": 1})).await.unwrap();
        assert_ne!(first["file_path"], second["file_path"]);
    }
}
