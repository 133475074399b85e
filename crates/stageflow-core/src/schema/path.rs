//! Source and target path parsing and context lookup.
//!
//! A path is a dot-separated sequence of segments with optional bracket
//! subscripts: `$.stage[0].activity[1].output.client_id` parses to the same
//! segments as `stage.0.activity.1.output.client_id`. Lookup traverses
//! nested objects by key and arrays by numeric segment; the context tree
//! keys stage and activity orders as strings, so numeric segments resolve
//! against both representations.

use serde_json::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    /// A dot-notation segment; may still be numeric (`stage.0`).
    Key(String),
    /// A bracket subscript (`stage[0]`). Targets treat these as array
    /// indices; sources treat them interchangeably with numeric keys.
    Index(usize),
}

impl Segment {
    fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }

    fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Key(k) => k.parse().ok(),
            Segment::Index(i) => Some(*i),
        }
    }
}

/// Parse a path into segments, stripping a leading `$.` and splitting
/// bracket subscripts out of their base segment.
pub(crate) fn parse_path(path: &str) -> Vec<Segment> {
    let trimmed = path.strip_prefix("$.").unwrap_or(path);
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);

    let mut segments = Vec::new();
    for piece in trimmed.split('.') {
        if piece.is_empty() {
            continue;
        }
        let mut rest = piece;
        // Base name before the first subscript, if any.
        if let Some(open) = rest.find('[') {
            if open > 0 {
                segments.push(Segment::Key(rest[..open].to_string()));
            }
            rest = &rest[open..];
            while let Some(close) = rest.find(']') {
                let inner = &rest[1..close];
                match inner.parse::<usize>() {
                    Ok(i) => segments.push(Segment::Index(i)),
                    // Malformed subscript: keep it as a literal key so the
                    // lookup misses instead of panicking.
                    Err(_) => segments.push(Segment::Key(inner.to_string())),
                }
                rest = &rest[close + 1..];
                if !rest.starts_with('[') {
                    break;
                }
            }
            if !rest.is_empty() {
                segments.push(Segment::Key(rest.to_string()));
            }
        } else {
            segments.push(Segment::Key(rest.to_string()));
        }
    }
    segments
}

/// Resolve a path against a context document. A missing segment yields
/// `None`; arrays are entered by numeric segment.
pub(crate) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in parse_path(path) {
        current = match current {
            Value::Object(map) => map.get(&segment.as_key())?,
            Value::Array(items) => items.get(segment.as_index()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` into `root` at `target`, materializing intermediate maps
/// and arrays. Bracket segments create arrays, growing them with nulls when
/// indices are skipped; dot segments create maps.
pub(crate) fn set_target(root: &mut Value, target: &str, value: Value) {
    let segments = parse_path(target);
    if segments.is_empty() {
        return;
    }
    insert_at(root, &segments, value);
}

fn insert_at(container: &mut Value, segments: &[Segment], value: Value) {
    let segment = &segments[0];
    let last = segments.len() == 1;

    match segment {
        Segment::Key(key) => {
            if !container.is_object() {
                *container = Value::Object(serde_json::Map::new());
            }
            let map = container.as_object_mut().expect("coerced to object");
            if last {
                map.insert(key.clone(), value);
            } else {
                let child = map.entry(key.clone()).or_insert(Value::Null);
                insert_at(child, &segments[1..], value);
            }
        }
        Segment::Index(index) => {
            if !container.is_array() {
                *container = Value::Array(Vec::new());
            }
            let items = container.as_array_mut().expect("coerced to array");
            while items.len() <= *index {
                items.push(Value::Null);
            }
            if last {
                items[*index] = value;
            } else {
                insert_at(&mut items[*index], &segments[1..], value);
            }
        }
    }
}
