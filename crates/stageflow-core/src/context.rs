//! # Workflow Context Tree
//!
//! The context tree is the nested key/value document accumulated over a
//! workflow's lifetime. It carries the caller's start parameters under
//! `input` and every activity's resolved input and output under the
//! canonical slot `stage.<stage_order>.activity.<activity_order>`:
//!
//! ```json
//! {
//!   "input":  { "client_id": "c-1", "plan": "premium" },
//!   "stage": {
//!     "1": { "activity": { "0": { "input": {…}, "output": {…} } } }
//!   }
//! }
//! ```
//!
//! The tree is stored serialized in `Workflow::context_json` and treated as
//! an opaque string by repositories; [`ContextTree`] is its transient
//! in-memory form during a single engine operation. The tree is append-only
//! at activity granularity: the engine writes each activity's slot once,
//! guarded by the activity state machine (a terminal activity is never
//! executed again).

use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

/// In-memory form of a workflow's context document.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextTree {
    root: Value,
}

impl ContextTree {
    /// Create a fresh tree holding validated start parameters.
    pub fn new(input: Value) -> Self {
        let mut root = Map::new();
        root.insert("input".to_string(), input);
        Self {
            root: Value::Object(root),
        }
    }

    /// Deserialize a tree from a workflow's `context_json`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(raw).map_err(|e| EngineError::SerializationError {
            message: format!("malformed workflow context: {}", e),
        })?;
        if !root.is_object() {
            return Err(EngineError::SerializationError {
                message: "workflow context must be a JSON object".to_string(),
            });
        }
        Ok(Self { root })
    }

    /// Serialize the tree back into the wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.root)?)
    }

    /// The underlying document, for mapping resolution.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// The document extended with an `activity_output` root, the shape
    /// output mappings resolve against.
    pub fn with_activity_output(&self, output: &Value) -> Value {
        let mut extended = self
            .root
            .as_object()
            .cloned()
            .unwrap_or_default();
        extended.insert("activity_output".to_string(), output.clone());
        Value::Object(extended)
    }

    /// Record an activity's resolved input at its canonical slot.
    pub fn record_activity_input(&mut self, stage_order: u32, activity_order: u32, input: Value) {
        self.activity_slot(stage_order, activity_order)
            .insert("input".to_string(), input);
    }

    /// Record an activity's output at its canonical slot.
    pub fn record_activity_output(&mut self, stage_order: u32, activity_order: u32, output: Value) {
        self.activity_slot(stage_order, activity_order)
            .insert("output".to_string(), output);
    }

    /// Merge additional fields into an activity's output slot. Used for
    /// template output mappings, whose resolved keys land next to the raw
    /// executor output.
    pub fn merge_activity_output(
        &mut self,
        stage_order: u32,
        activity_order: u32,
        fields: Map<String, Value>,
    ) {
        let slot = self.activity_slot(stage_order, activity_order);
        let output = slot
            .entry("output".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(existing) = output {
            existing.extend(fields);
        } else {
            // Non-object executor output: the mapped fields replace it.
            *output = Value::Object(fields);
        }
    }

    fn activity_slot(&mut self, stage_order: u32, activity_order: u32) -> &mut Map<String, Value> {
        let root = self.root.as_object_mut().expect("context root is an object");
        let stages = ensure_object(root, "stage");
        let stage = ensure_object(stages, &stage_order.to_string());
        let activities = ensure_object(stage, "activity");
        ensure_object(activities, &activity_order.to_string())
    }
}

fn ensure_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut().expect("entry coerced to object")
}
