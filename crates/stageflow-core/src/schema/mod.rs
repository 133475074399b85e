//! # Schema Processor
//!
//! A pure, stateless value transformer with two entry points:
//!
//! - [`resolve`] — given a workflow context tree and a mapping document,
//!   produce the derived key/value map. Used to compute an activity's
//!   effective input and to fold executor output back into the context.
//! - [`validate_input`] — given caller-supplied input and an optional
//!   declarative schema, return a validated and enriched map: required
//!   fields enforced, defaults applied, declared types coerced, unknown
//!   fields passed through unchanged.
//!
//! ## Mapping documents
//!
//! Two shapes are accepted and auto-detected per target field:
//!
//! ```json
//! { "email":   "$.input.user.email",
//!   "user_id": { "source": "$.input.id", "type": "string", "required": true } }
//! ```
//!
//! Source paths are dot-separated; a leading `$.` is stripped and bracket
//! subscripts are equivalent to dot segments (`stage[0].output` ≡
//! `stage.0.output`). A source containing `${ path }` occurrences is treated
//! as a string template: each occurrence is replaced with the stringified
//! value at the path, missing values becoming the empty string.
//!
//! Target fields may themselves use dot and bracket notation to materialize
//! nested maps and arrays: `"to[0].address"` produces
//! `{"to": [{"address": …}]}`, and skipped array indices are null-filled.

mod mapping;
mod path;
mod validate;

pub use mapping::resolve;
pub use validate::validate_input;

pub(crate) use validate::validate_input_json;

use serde_json::Value;

/// Apply a declared coercion to a value. Unknown type names pass the value
/// through unchanged; failures report a human-readable reason.
pub(crate) fn coerce_value(value: Value, declared: &str) -> Result<Value, String> {
    match declared {
        "string" => Ok(match value {
            Value::String(_) => value,
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            // Non-scalars pass through; stringifying a whole subtree is
            // never what a mapping author wants.
            other => other,
        }),
        "int" | "integer" => match &value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::from(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::from(f.trunc() as i64))
                } else {
                    Err(format!("cannot coerce {} to int", n))
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| {
                    s.trim()
                        .parse::<f64>()
                        .map(|f| Value::from(f.trunc() as i64))
                })
                .map_err(|_| format!("cannot coerce {:?} to int", s)),
            other => Err(format!("cannot coerce {} to int", type_name(other))),
        },
        "bool" | "boolean" => Ok(Value::Bool(match value {
            Value::Bool(b) => b,
            Value::String(s) => s == "true",
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            _ => false,
        })),
        _ => Ok(value),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
