//! Input validation against declarative schemas.

use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

use super::coerce_value;

/// Validate and enrich caller-supplied input against an optional schema.
///
/// Two schema shapes are accepted: the structured mapping shape (field →
/// `{type, default, required}` descriptors) and a JSON-Schema-style object
/// (`{type: "object", properties: {…}, required: […]}`). In both cases,
/// declared fields absent from the input are filled from their default or
/// reported as errors when required; declared types are coerced; fields
/// present in the input but absent from the schema pass through verbatim.
/// All violations found in one call are aggregated into a single
/// [`EngineError::ValidationFailed`].
pub fn validate_input(input: &Value, schema: Option<&Value>) -> Result<Value> {
    let Some(schema) = schema else {
        return Ok(input.clone());
    };

    let mut output = input
        .as_object()
        .cloned()
        .ok_or_else(|| EngineError::ValidationFailed {
            message: "input must be a JSON object".to_string(),
        })?;

    let mut errors: Vec<String> = Vec::new();

    for field in declared_fields(schema) {
        match output.get(field.name) {
            Some(present) => {
                if let Some(ty) = field.declared_type {
                    match coerce_value(present.clone(), ty) {
                        Ok(coerced) => {
                            output.insert(field.name.to_string(), coerced);
                        }
                        Err(reason) => errors.push(format!("field {:?}: {}", field.name, reason)),
                    }
                }
            }
            None => {
                if let Some(default) = field.default {
                    output.insert(field.name.to_string(), default.clone());
                } else if field.required {
                    errors.push(format!("missing required field: {}", field.name));
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(EngineError::ValidationFailed {
            message: errors.join("; "),
        });
    }
    Ok(Value::Object(output))
}

struct DeclaredField<'a> {
    name: &'a str,
    declared_type: Option<&'a str>,
    default: Option<&'a Value>,
    required: bool,
}

/// Enumerate the fields a schema declares, across both accepted shapes.
fn declared_fields(schema: &Value) -> Vec<DeclaredField<'_>> {
    let Some(root) = schema.as_object() else {
        return Vec::new();
    };

    // JSON-Schema style: { type: "object", properties: {…}, required: […] }.
    if root.get("type").and_then(Value::as_str) == Some("object") {
        let required: Vec<&str> = root
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let Some(properties) = root.get("properties").and_then(Value::as_object) else {
            return Vec::new();
        };
        return properties
            .iter()
            .map(|(name, spec)| DeclaredField {
                name,
                declared_type: spec.get("type").and_then(Value::as_str),
                default: spec.get("default"),
                required: required.contains(&name.as_str()),
            })
            .collect();
    }

    // Structured mapping shape: field → { type, default, required }.
    root.iter()
        .filter_map(|(name, spec)| {
            let descriptor = spec.as_object()?;
            Some(DeclaredField {
                name,
                declared_type: descriptor.get("type").and_then(Value::as_str),
                default: descriptor.get("default"),
                required: descriptor
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        })
        .collect()
}

/// Validate a raw JSON string, the wire form callers hand to the engine.
pub(crate) fn validate_input_json(raw: &str, schema: Option<&Value>) -> Result<Value> {
    let parsed: Value = if raw.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).map_err(|e| EngineError::ValidationFailed {
            message: format!("input is not valid JSON: {}", e),
        })?
    };
    validate_input(&parsed, schema)
}
