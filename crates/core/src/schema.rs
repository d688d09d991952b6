//! Argument-schema validation for tool calls.
//!
//! Tool parameter schemas are declared as JSON Schema fragments
//! (`serde_json::Value`, the same value sent to the model in the tool
//! definition). The dispatcher validates every tool-call payload against the
//! declared schema *before* the tool executes, so adapters only ever see
//! well-formed arguments.
//!
//! This walker covers the subset the tool declarations actually use:
//! top-level object shape, `required` fields, and primitive `type` checks on
//! declared properties. Unknown properties are rejected so the model gets a
//! corrective error instead of silently dropped arguments.

use serde_json::Value;

/// Validate `arguments` against a JSON Schema fragment.
///
/// Returns a human-readable error description on failure; the dispatcher
/// surfaces it to the model as a failed tool result so it can retry with
/// corrected arguments.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), String> {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        // Tools always declare object parameter schemas.
        return Err("tool schema must declare an object type".into());
    }

    let obj = arguments
        .as_object()
        .ok_or_else(|| format!("arguments must be a JSON object, got: {arguments}"))?;

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            match obj.get(field) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required argument '{field}'"));
                }
                Some(_) => {}
            }
        }
    }

    for (key, value) in obj {
        let Some(decl) = properties.get(key) else {
            return Err(format!("unknown argument '{key}'"));
        };
        if let Some(expected) = decl.get("type").and_then(Value::as_str) {
            if !type_matches(expected, value) {
                return Err(format!(
                    "argument '{key}' must be of type {expected}, got: {value}"
                ));
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "A single SQL statement" },
                "limit": { "type": "integer" }
            },
            "required": ["query"]
        })
    }

    #[test]
    fn valid_arguments_pass() {
        let args = json!({"query": "SELECT 1", "limit": 10});
        assert!(validate_arguments(&query_schema(), &args).is_ok());
    }

    #[test]
    fn missing_required_field_fails() {
        let args = json!({"limit": 10});
        let err = validate_arguments(&query_schema(), &args).unwrap_err();
        assert!(err.contains("query"), "error should name the field: {err}");
    }

    #[test]
    fn null_required_field_fails() {
        let args = json!({"query": null});
        assert!(validate_arguments(&query_schema(), &args).is_err());
    }

    #[test]
    fn wrong_type_fails() {
        let args = json!({"query": 42});
        let err = validate_arguments(&query_schema(), &args).unwrap_err();
        assert!(err.contains("string"));
    }

    #[test]
    fn unknown_argument_fails() {
        let args = json!({"query": "SELECT 1", "sql": "SELECT 2"});
        let err = validate_arguments(&query_schema(), &args).unwrap_err();
        assert!(err.contains("sql"));
    }

    #[test]
    fn non_object_arguments_fail() {
        let args = json!("SELECT 1");
        assert!(validate_arguments(&query_schema(), &args).is_err());
    }
}
