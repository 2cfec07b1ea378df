//! Built-in tools bundled with the engine.
//!
//! These cover the three shapes a tool takes in practice: a pure local
//! computation ([`EchoTool`], [`CurrentTimeTool`]) and a thin REST wrapper
//! ([`RestGetTool`]) of the kind the scientific data-access catalog is
//! made of - the endpoint template lives in the spec's `fields`, the tool
//! body just substitutes arguments and performs the request.
//!
//! All built-in types are available through [`ToolFactory::with_builtins`],
//! so a JSON definition file referencing `"type": "RestGetTool"` resolves
//! without any code.
//!
//! [`ToolFactory::with_builtins`]: crate::tools::ToolFactory::with_builtins

use crate::error::ToolUniverseError;
use crate::spec::{ParamType, ParameterSchema, PropertySpec, ToolSpec};
use crate::tools::{StreamCallback, Tool, ToolFactory};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Echoes its input back; used to validate dispatch plumbing end to end
/// without touching any third-party API.
#[derive(Debug, Default)]
pub struct EchoTool;

impl EchoTool {
    pub fn new() -> Self {
        Self
    }

    /// Declarative spec matching this tool's contract
    pub fn spec() -> ToolSpec {
        ToolSpec::new("echo_tool", "EchoTool")
            .with_description("Echo the provided text back to the caller")
            .with_category("utility")
            .with_parameters(
                ParameterSchema::empty()
                    .property(
                        "text",
                        PropertySpec::new(ParamType::String).with_description("Text to echo"),
                    )
                    .require("text"),
            )
    }
}

#[async_trait]
impl Tool for EchoTool {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolUniverseError> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolUniverseError::execution("missing 'text' argument"))?;
        Ok(json!({"result": text}))
    }

    async fn execute_streaming(
        &self,
        arguments: Value,
        on_chunk: StreamCallback,
    ) -> Result<Value, ToolUniverseError> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolUniverseError::execution("missing 'text' argument"))?;
        // Word-by-word chunks; enough to observe incremental delivery
        for word in text.split_inclusive(' ') {
            on_chunk(word);
        }
        Ok(json!({"result": text}))
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

/// Reports the current UTC time
#[derive(Debug, Default)]
pub struct CurrentTimeTool;

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self
    }

    pub fn spec() -> ToolSpec {
        ToolSpec::new("current_time", "CurrentTimeTool")
            .with_description("Get the current UTC time")
            .with_category("utility")
            .with_parameters(ParameterSchema::empty().property(
                "format",
                PropertySpec::new(ParamType::String)
                    .with_description("chrono format string")
                    .with_default(json!("%Y-%m-%dT%H:%M:%SZ")),
            ))
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolUniverseError> {
        let format = arguments
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("%Y-%m-%dT%H:%M:%SZ");
        let now = chrono::Utc::now();
        Ok(json!({
            "formatted": now.format(format).to_string(),
            "timestamp": now.timestamp(),
        }))
    }
}

/// Thin GET wrapper around a single REST endpoint.
///
/// The endpoint template comes from the spec's `fields`:
///
/// ```json
/// "fields": {
///     "endpoint": "https://rest.uniprot.org/uniprotkb/{accession}",
///     "timeout_secs": 30
/// }
/// ```
///
/// `{placeholders}` are substituted from the call arguments; any remaining
/// arguments are sent as query parameters.
#[derive(Debug)]
pub struct RestGetTool {
    endpoint: String,
    client: reqwest::Client,
}

impl RestGetTool {
    pub fn from_spec(spec: &ToolSpec) -> Result<Self, ToolUniverseError> {
        let endpoint = spec
            .fields
            .get("endpoint")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolUniverseError::configuration(format!(
                    "tool '{}' needs fields.endpoint for RestGetTool",
                    spec.name
                ))
            })?
            .to_string();

        let timeout_secs = spec
            .fields
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .unwrap_or(30);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ToolUniverseError::configuration(e.to_string()))?;

        Ok(Self { endpoint, client })
    }

    /// Substitute `{name}` placeholders, returning the url and leftover args
    fn render_url(&self, arguments: &Value) -> (String, Vec<(String, String)>) {
        let mut url = self.endpoint.clone();
        let mut query = Vec::new();

        if let Some(obj) = arguments.as_object() {
            for (key, value) in obj {
                let placeholder = format!("{{{}}}", key);
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if url.contains(&placeholder) {
                    url = url.replace(&placeholder, &rendered);
                } else {
                    query.push((key.clone(), rendered));
                }
            }
        }

        (url, query)
    }
}

#[async_trait]
impl Tool for RestGetTool {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolUniverseError> {
        let (url, query) = self.render_url(&arguments);

        tracing::debug!("RestGetTool GET {} ({} query params)", url, query.len());

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ToolUniverseError::transport(format!("GET {} failed: {}", url, e))
                } else {
                    ToolUniverseError::execution(format!("GET {} failed: {}", url, e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolUniverseError::transport(format!("reading response body: {}", e)))?;

        if !status.is_success() {
            return Err(ToolUniverseError::execution(format!(
                "GET {} returned HTTP {}: {}",
                url,
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        // Upstream APIs are JSON almost everywhere; fall back to raw text
        match serde_json::from_str::<Value>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) => Ok(json!({"body": body, "status": status.as_u16()})),
        }
    }
}

/// Register the built-in tool types with a factory
pub fn register_builtin_types(factory: &mut ToolFactory) {
    factory.register_type("EchoTool", |_spec| {
        Ok(Arc::new(EchoTool::new()) as Arc<dyn Tool>)
    });
    factory.register_type("CurrentTimeTool", |_spec| {
        Ok(Arc::new(CurrentTimeTool::new()) as Arc<dyn Tool>)
    });
    factory.register_type("RestGetTool", |spec| {
        Ok(Arc::new(RestGetTool::from_spec(spec)?) as Arc<dyn Tool>)
    });
}

/// Specs for the built-ins that need no per-tool configuration
pub fn builtin_specs() -> Vec<ToolSpec> {
    vec![EchoTool::spec(), CurrentTimeTool::spec()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_echo_roundtrip() {
        let tool = EchoTool::new();
        let result = tool.execute(json!({"text": "hi"})).await.unwrap();
        assert_eq!(result["result"], "hi");
    }

    #[tokio::test]
    async fn test_echo_streaming_chunks() {
        let tool = EchoTool::new();
        let seen = Arc::new(Mutex::new(String::new()));
        let seen_clone = seen.clone();
        let callback: StreamCallback = Arc::new(move |chunk| {
            seen_clone.lock().unwrap().push_str(chunk);
        });

        let result = tool
            .execute_streaming(json!({"text": "hello brave world"}), callback)
            .await
            .unwrap();

        assert_eq!(result["result"], "hello brave world");
        assert_eq!(&*seen.lock().unwrap(), "hello brave world");
    }

    #[tokio::test]
    async fn test_current_time_default_format() {
        let tool = CurrentTimeTool::new();
        let result = tool.execute(json!({})).await.unwrap();
        assert!(result["formatted"].as_str().unwrap().ends_with('Z'));
        assert!(result["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_rest_tool_requires_endpoint() {
        let spec = ToolSpec::new("broken_rest", "RestGetTool");
        assert!(RestGetTool::from_spec(&spec).is_err());
    }

    #[test]
    fn test_rest_tool_url_rendering() {
        let spec = ToolSpec::new("uniprot_entry", "RestGetTool").with_fields(json!({
            "endpoint": "https://rest.uniprot.org/uniprotkb/{accession}"
        }));
        let tool = RestGetTool::from_spec(&spec).unwrap();

        let (url, query) = tool.render_url(&json!({"accession": "P04637", "fields": "gene_names"}));
        assert_eq!(url, "https://rest.uniprot.org/uniprotkb/P04637");
        assert_eq!(query, vec![("fields".to_string(), "gene_names".to_string())]);
    }

    #[test]
    fn test_factory_knows_builtins() {
        let factory = ToolFactory::with_builtins();
        assert!(factory.knows("EchoTool"));
        assert!(factory.knows("CurrentTimeTool"));
        assert!(factory.knows("RestGetTool"));
    }
}
