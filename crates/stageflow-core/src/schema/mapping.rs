//! Mapping resolution: deriving a target map from the workflow context.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

use super::path::{lookup, set_target};
use super::coerce_value;

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{\s*([^}]*?)\s*\}").expect("valid interpolation pattern"));

/// Resolve a mapping document against a context tree.
///
/// Each target field is derived from its source: a plain path is looked up
/// in the context, a `${ path }` template is interpolated, and a structured
/// descriptor additionally applies `type` coercion and a `default` fallback.
/// A field whose source is missing and has no default is omitted from the
/// result. Target names use dot/bracket notation and may materialize nested
/// maps and arrays.
pub fn resolve(context: &Value, mapping: &Value) -> Result<Value> {
    let entries = mapping
        .as_object()
        .ok_or_else(|| EngineError::ValidationFailed {
            message: "mapping document must be a JSON object".to_string(),
        })?;

    let mut result = Value::Object(Map::new());
    let mut errors: Vec<String> = Vec::new();

    for (target, descriptor) in entries {
        let (source, declared_type, default) = match descriptor {
            // Structured shape: { source, type, default, required }. A
            // descriptor without a source resolves to its default, which is
            // how a mapping expresses a literal constant.
            Value::Object(fields) => {
                let source = match fields.get("source") {
                    Some(Value::String(s)) => Some(s.as_str()),
                    Some(_) => {
                        errors.push(format!("field {:?}: source must be a string", target));
                        continue;
                    }
                    None => None,
                };
                (
                    source,
                    fields.get("type").and_then(Value::as_str),
                    fields.get("default"),
                )
            }
            // Simple shape: target → source path.
            Value::String(source) => (Some(source.as_str()), None, None),
            // Anything else is carried into the result as a literal.
            other => {
                set_target(&mut result, target, other.clone());
                continue;
            }
        };

        let resolved = match source {
            Some(source) if INTERPOLATION.is_match(source) => {
                Some(Value::String(interpolate(context, source)))
            }
            Some(source) => lookup(context, source).cloned().or_else(|| default.cloned()),
            None => default.cloned(),
        };

        let Some(raw) = resolved else {
            // Source missing, no default: the target field is omitted.
            continue;
        };

        let value = match declared_type {
            Some(ty) => match coerce_value(raw, ty) {
                Ok(v) => v,
                Err(reason) => {
                    errors.push(format!("field {:?}: {}", target, reason));
                    continue;
                }
            },
            None => raw,
        };

        set_target(&mut result, target, value);
    }

    if !errors.is_empty() {
        return Err(EngineError::ValidationFailed {
            message: errors.join("; "),
        });
    }
    Ok(result)
}

/// Replace every `${ path }` occurrence with the stringified context value;
/// missing paths become the empty string.
fn interpolate(context: &Value, template: &str) -> String {
    INTERPOLATION
        .replace_all(template, |caps: &regex::Captures<'_>| {
            lookup(context, &caps[1]).map(stringify).unwrap_or_default()
        })
        .into_owned()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
