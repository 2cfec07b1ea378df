//! Argument validation against a tool's declared parameter schema.
//!
//! Validation runs before execution, so a failing call never reaches the
//! tool body and never causes side effects. The rules:
//!
//! - every required property must be present
//! - scalar values are coerced toward their declared type (numeric string
//!   to number, "true"/"false" to boolean, scalar to string); arrays and
//!   objects must match their declared shape exactly, no coercion
//! - enum-constrained properties must hold one of the allowed values
//! - defaults are injected for absent optional properties; a property that
//!   is both required and carries a default is still an error when absent
//!   (required wins, the default is ignored)
//! - undeclared properties pass through unless the schema sets
//!   `additionalProperties: false`
//!
//! Failures carry the violating field and `next_steps` remediation hints,
//! including "did you mean" candidates for near-miss argument names.

use crate::error::ToolUniverseError;
use crate::spec::{ParamType, PropertySpec, ToolSpec};
use serde_json::{Map, Number, Value};

/// Validate and normalize a raw argument object against a tool spec.
///
/// Returns the validated argument map with coercions and defaults applied.
pub fn validate(spec: &ToolSpec, arguments: &Value) -> Result<Map<String, Value>, ToolUniverseError> {
    let args = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        other => {
            return Err(ToolUniverseError::validation(
                "arguments",
                format!("arguments must be an object, got {}", type_name(other)),
                vec!["Pass arguments as a JSON object keyed by parameter name".to_string()],
            ))
        }
    };

    let schema = &spec.parameters;
    let mut validated = Map::new();

    // Required presence comes first; absence is an error even when the
    // property declares a default.
    for name in &schema.required {
        if !args.contains_key(name) {
            return Err(ToolUniverseError::validation(
                name.clone(),
                format!("missing required parameter '{}'", name),
                vec![format!("Provide the '{}' argument", name)],
            ));
        }
    }

    for (name, value) in &args {
        match schema.properties.get(name) {
            Some(prop) => {
                let coerced = check_property(name, prop, value)?;
                validated.insert(name.clone(), coerced);
            }
            None => {
                if schema.additional_properties {
                    validated.insert(name.clone(), value.clone());
                } else {
                    let declared: Vec<&str> =
                        schema.properties.keys().map(String::as_str).collect();
                    let mut next_steps = vec![format!(
                        "Remove '{}' or check the tool's declared parameters",
                        name
                    )];
                    for candidate in closest_matches(name, &declared, 1) {
                        next_steps.push(format!("Did you mean field '{}'?", candidate));
                    }
                    return Err(ToolUniverseError::validation(
                        name.clone(),
                        format!("unknown parameter '{}' (additional properties not allowed)", name),
                        next_steps,
                    ));
                }
            }
        }
    }

    // Defaults apply to optional properties only
    for (name, prop) in &schema.properties {
        if validated.contains_key(name) || schema.required.iter().any(|r| r == name) {
            continue;
        }
        if let Some(default) = &prop.default {
            validated.insert(name.clone(), default.clone());
        }
    }

    Ok(validated)
}

/// Check a single property value, coercing scalars toward the declared type
fn check_property(
    name: &str,
    prop: &PropertySpec,
    value: &Value,
) -> Result<Value, ToolUniverseError> {
    let coerced = coerce(prop.param_type, value).ok_or_else(|| {
        ToolUniverseError::validation(
            name.to_string(),
            format!(
                "parameter '{}' expects {}, got {}",
                name,
                prop.param_type.as_str(),
                type_name(value)
            ),
            vec![format!(
                "Convert '{}' to a {} value",
                name,
                prop.param_type.as_str()
            )],
        )
    })?;

    // Array element types are checked exactly, never coerced
    if prop.param_type == ParamType::Array {
        if let (Some(items), Value::Array(elements)) = (&prop.items, &coerced) {
            for (index, element) in elements.iter().enumerate() {
                if !matches_exact(items.param_type, element) {
                    return Err(ToolUniverseError::validation(
                        name.to_string(),
                        format!(
                            "parameter '{}' element {} expects {}, got {}",
                            name,
                            index,
                            items.param_type.as_str(),
                            type_name(element)
                        ),
                        vec![format!(
                            "Ensure every element of '{}' is a {}",
                            name,
                            items.param_type.as_str()
                        )],
                    ));
                }
            }
        }
    }

    if let Some(allowed) = &prop.allowed_values {
        if !allowed.contains(&coerced) {
            let rendered: Vec<String> = allowed.iter().map(render_value).collect();
            return Err(ToolUniverseError::validation(
                name.to_string(),
                format!(
                    "parameter '{}' must be one of [{}], got {}",
                    name,
                    rendered.join(", "),
                    render_value(&coerced)
                ),
                vec![format!("Choose one of: {}", rendered.join(", "))],
            ));
        }
    }

    Ok(coerced)
}

/// Attempt scalar coercion; arrays and objects must match exactly
fn coerce(target: ParamType, value: &Value) -> Option<Value> {
    if matches_exact(target, value) {
        return Some(normalize_exact(target, value));
    }
    if !target.is_scalar() {
        return None;
    }

    match (target, value) {
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        (ParamType::Number, Value::String(s)) => {
            s.trim().parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
        }
        (ParamType::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(|i| Value::Number(i.into()))
        }
        (ParamType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Exact type match without coercion
fn matches_exact(target: ParamType, value: &Value) -> bool {
    match target {
        ParamType::String => value.is_string(),
        // Whole-valued floats like 2.0 count as integers
        ParamType::Integer => {
            value.as_i64().is_some()
                || value.as_u64().is_some()
                || value.as_f64().map_or(false, is_whole_float)
        }
        // Integers are acceptable where a number is declared
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Array => value.is_array(),
        ParamType::Object => value.is_object(),
    }
}

/// Normalize exact matches (e.g. float-typed integers for integer params)
fn normalize_exact(target: ParamType, value: &Value) -> Value {
    if target == ParamType::Integer {
        if let Some(i) = value.as_i64() {
            return Value::Number(i.into());
        }
        if value.as_u64().is_none() {
            if let Some(f) = value.as_f64() {
                if is_whole_float(f) {
                    return Value::Number((f as i64).into());
                }
            }
        }
    }
    value.clone()
}

/// A float representing an integer exactly within i64 range
fn is_whole_float(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Names within a small edit distance of `target`, best matches first.
///
/// Used for "did you mean" hints on unknown arguments and unknown tool
/// names. The distance bound scales with name length so long tool names
/// still match on a couple of typos.
pub fn closest_matches(target: &str, candidates: &[&str], limit: usize) -> Vec<String> {
    let max_distance = (target.len() / 4).max(2);
    let mut scored: Vec<(usize, &str)> = candidates
        .iter()
        .filter_map(|candidate| {
            let distance = edit_distance(target, candidate);
            (distance <= max_distance && distance > 0).then_some((distance, *candidate))
        })
        .collect();
    scored.sort_by_key(|(distance, name)| (*distance, name.to_string()));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Levenshtein distance, single-row formulation
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut previous_diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous_diagonal + usize::from(ca != cb);
            previous_diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ParameterSchema;
    use serde_json::json;

    fn math_spec() -> ToolSpec {
        ToolSpec::new("simple_math_tool", "SimpleMathTool").with_parameters(
            ParameterSchema::empty()
                .property(
                    "operation",
                    PropertySpec::new(ParamType::String).with_allowed_values(vec![
                        json!("add"),
                        json!("subtract"),
                    ]),
                )
                .property("a", PropertySpec::new(ParamType::Number))
                .property("b", PropertySpec::new(ParamType::Number))
                .property(
                    "precision",
                    PropertySpec::new(ParamType::Integer).with_default(json!(2)),
                )
                .require("operation")
                .require("a")
                .require("b"),
        )
    }

    #[test]
    fn test_valid_arguments_pass() {
        let validated =
            validate(&math_spec(), &json!({"operation": "add", "a": 1, "b": 2})).unwrap();
        assert_eq!(validated["operation"], "add");
        assert_eq!(validated["a"], 1);
        // Default injected for absent optional
        assert_eq!(validated["precision"], 2);
    }

    #[test]
    fn test_missing_required_fails() {
        let err = validate(&math_spec(), &json!({"operation": "add", "a": 1})).unwrap_err();
        match err {
            ToolUniverseError::Validation { field, next_steps, .. } => {
                assert_eq!(field, "b");
                assert!(!next_steps.is_empty());
            }
            other => panic!("expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_string_coercion() {
        let validated =
            validate(&math_spec(), &json!({"operation": "add", "a": "1.5", "b": "2"})).unwrap();
        assert_eq!(validated["a"], 1.5);
        assert_eq!(validated["b"], 2.0);
    }

    #[test]
    fn test_whole_float_accepted_for_integer_param() {
        let validated =
            validate(&math_spec(), &json!({"operation": "add", "a": 1, "b": 2, "precision": 2.0}))
                .unwrap();
        // Normalized to a plain integer
        assert_eq!(validated["precision"], json!(2));
        assert!(validated["precision"].as_i64().is_some());

        let err =
            validate(&math_spec(), &json!({"operation": "add", "a": 1, "b": 2, "precision": 2.5}));
        assert!(err.is_err());
    }

    #[test]
    fn test_boolean_string_coercion() {
        let spec = ToolSpec::new("t", "T").with_parameters(
            ParameterSchema::empty().property("flag", PropertySpec::new(ParamType::Boolean)),
        );
        let validated = validate(&spec, &json!({"flag": "true"})).unwrap();
        assert_eq!(validated["flag"], true);
        assert!(validate(&spec, &json!({"flag": "yes"})).is_err());
    }

    #[test]
    fn test_no_coercion_for_arrays() {
        let spec = ToolSpec::new("t", "T").with_parameters(
            ParameterSchema::empty().property("ids", PropertySpec::new(ParamType::Array)),
        );
        assert!(validate(&spec, &json!({"ids": "not-an-array"})).is_err());
        assert!(validate(&spec, &json!({"ids": [1, 2]})).is_ok());
    }

    #[test]
    fn test_array_items_checked_exactly() {
        let mut prop = PropertySpec::new(ParamType::Array);
        prop.items = Some(Box::new(PropertySpec::new(ParamType::String)));
        let spec = ToolSpec::new("t", "T")
            .with_parameters(ParameterSchema::empty().property("genes", prop));

        assert!(validate(&spec, &json!({"genes": ["TP53", "BRCA1"]})).is_ok());
        let err = validate(&spec, &json!({"genes": ["TP53", 42]})).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn test_enum_constraint() {
        let err = validate(&math_spec(), &json!({"operation": "divide", "a": 1, "b": 2}))
            .unwrap_err();
        assert!(err.to_string().contains("must be one of"));
    }

    #[test]
    fn test_required_wins_over_default() {
        let spec = ToolSpec::new("t", "T").with_parameters(
            ParameterSchema::empty()
                .property(
                    "query",
                    PropertySpec::new(ParamType::String).with_default(json!("all")),
                )
                .require("query"),
        );
        // Absent required with declared default is still an error
        assert!(validate(&spec, &json!({})).is_err());
    }

    #[test]
    fn test_unknown_properties_pass_through_by_default() {
        let validated = validate(
            &math_spec(),
            &json!({"operation": "add", "a": 1, "b": 2, "extra": "kept"}),
        )
        .unwrap();
        assert_eq!(validated["extra"], "kept");
    }

    #[test]
    fn test_additional_properties_denied_with_suggestion() {
        let spec = ToolSpec::new("t", "T").with_parameters(
            ParameterSchema::empty()
                .property("ensemblId", PropertySpec::new(ParamType::String))
                .deny_additional(),
        );
        let err = validate(&spec, &json!({"ensemblid": "ENSG00000012048"})).unwrap_err();
        match err {
            ToolUniverseError::Validation { next_steps, .. } => {
                assert!(next_steps.iter().any(|s| s.contains("ensemblId")));
            }
            other => panic!("expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_arguments_treated_as_empty() {
        let spec = ToolSpec::new("t", "T");
        assert!(validate(&spec, &Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("echo_tool", "echo_tool"), 0);
        assert_eq!(edit_distance("echo_tol", "echo_tool"), 1);
        assert_eq!(edit_distance("abc", ""), 3);
    }

    #[test]
    fn test_closest_matches_ordering() {
        let candidates = ["echo_tool", "current_time", "echo_tools"];
        let matches = closest_matches("echo_tol", &candidates, 2);
        assert_eq!(matches[0], "echo_tool");
    }
}
