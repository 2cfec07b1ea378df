//! Declarative tool interface descriptions.
//!
//! A [`ToolSpec`] describes what a tool looks like from the outside: its
//! unique name, a human-readable description, the implementing tool type,
//! and a [`ParameterSchema`] declaring argument names, types, defaults and
//! the required set. Specs are created at load time from static JSON
//! definition records (or programmatically), and are immutable once
//! registered.
//!
//! The JSON record shape matches the declarative configuration format used
//! by tool definition files:
//!
//! ```json
//! {
//!     "name": "simple_math_tool",
//!     "type": "SimpleMathTool",
//!     "description": "Simple mathematical operations",
//!     "parameter": {
//!         "type": "object",
//!         "properties": {
//!             "operation": {"type": "string", "enum": ["add", "subtract"]},
//!             "a": {"type": "number", "description": "First number"},
//!             "b": {"type": "number", "description": "Second number"}
//!         },
//!         "required": ["operation", "a", "b"]
//!     },
//!     "fields": {}
//! }
//! ```

use crate::error::ToolUniverseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared JSON types for tool parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Whether this type participates in scalar coercion during validation
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Integer | ParamType::Number | ParamType::Boolean
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

/// Declaration for a single parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Declared JSON type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values, when the parameter is an enumeration
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    /// Default injected when an optional parameter is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Element type for array parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySpec>>,
}

impl PropertySpec {
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            description: None,
            allowed_values: None,
            default: None,
            items: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = Some(values);
        self
    }
}

/// Parameter schema for a tool: declared properties plus the required set.
///
/// A BTreeMap keeps property iteration deterministic, which keeps error
/// messages and suggestion ordering stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Declared properties by name
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySpec>,
    /// Names of required properties; must be a subset of `properties`
    #[serde(default)]
    pub required: Vec<String>,
    /// When false, arguments not declared in `properties` are rejected
    #[serde(default = "default_additional_properties", rename = "additionalProperties")]
    pub additional_properties: bool,
}

fn default_additional_properties() -> bool {
    true
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: default_additional_properties(),
        }
    }
}

impl ParameterSchema {
    /// Empty schema accepting any object
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style property declaration
    pub fn property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.insert(name.into(), spec);
        self
    }

    /// Builder-style required marker; the property must also be declared
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Reject undeclared argument names
    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = false;
        self
    }

    /// Check the required-subset invariant
    pub fn check_invariants(&self, tool_name: &str) -> Result<(), ToolUniverseError> {
        for name in &self.required {
            if !self.properties.contains_key(name) {
                return Err(ToolUniverseError::configuration(format!(
                    "tool '{}' declares required parameter '{}' with no matching property",
                    tool_name, name
                )));
            }
        }
        Ok(())
    }
}

/// Immutable description of a tool's declared interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique name within a registry
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// The implementing class/category, used to resolve an executable
    /// through the tool factory when loading from JSON definitions
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Declared parameter schema
    #[serde(default, rename = "parameter")]
    pub parameters: ParameterSchema,
    /// Optional declared return schema (informational)
    #[serde(default, rename = "return_schema", skip_serializing_if = "Option::is_none")]
    pub return_schema: Option<Value>,
    /// Tool-type-specific configuration (endpoint templates, formats, ...)
    #[serde(default)]
    pub fields: Value,
    /// Optional grouping category for listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ToolSpec {
    /// Minimal spec with an empty parameter schema
    pub fn new(name: impl Into<String>, tool_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tool_type: tool_type.into(),
            parameters: ParameterSchema::empty(),
            return_schema: None,
            fields: Value::Null,
            category: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameters(mut self, parameters: ParameterSchema) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_fields(mut self, fields: Value) -> Self {
        self.fields = fields;
        self
    }

    /// Parse a declarative definition record
    pub fn from_config(record: &Value) -> Result<Self, ToolUniverseError> {
        let spec: ToolSpec = serde_json::from_value(record.clone()).map_err(|e| {
            ToolUniverseError::configuration(format!("invalid tool definition: {}", e))
        })?;
        if spec.name.is_empty() {
            return Err(ToolUniverseError::configuration(
                "tool definition is missing a name",
            ));
        }
        spec.parameters.check_invariants(&spec.name)?;
        Ok(spec)
    }

    /// Render the schema in the `{name, description, input_schema}` shape
    /// consumed by schema listings and remote catalogs
    pub fn schema_value(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": {
                "type": "object",
                "properties": self.parameters.properties,
                "required": self.parameters.required,
            }
        })
    }
}
