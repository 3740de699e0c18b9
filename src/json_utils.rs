//! Tree helpers over `serde_json::Value`: path lookup/assignment, deep key
//! sorting, deep merge and shallow defaults.

use crate::error::{Error, Result};
use crate::path::as_index;
use serde_json::{Map, Value};

/// Walk `segments` down from `tree`. Missing intermediates (or scalars in the
/// way) yield `None` rather than an error.
pub fn get_path<'tree>(tree: &'tree Value, segments: &[String]) -> Option<&'tree Value> {
    let mut cursor = tree;
    for segment in segments {
        cursor = match cursor {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => arr.get(as_index(segment)?)?,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => return None,
        };
    }
    Some(cursor)
}

/// Assign `value` at `segments`, creating intermediate containers as needed.
///
/// A missing or scalar intermediate is replaced by an array when the next
/// segment is an index and by an object otherwise. An array index may
/// overwrite an element or append one right at the end; anything further out
/// fails, as does addressing an array with a non-index segment.
pub fn set_path(tree: &mut Value, segments: &[String], value: Value) -> Result<()> {
    let Some((last, prefix)) = segments.split_last() else {
        *tree = value;
        return Ok(());
    };

    let mut cursor = tree;
    for (i, segment) in prefix.iter().enumerate() {
        let next_is_index = as_index(&segments[i + 1]).is_some();
        let slot = child_slot(cursor, segment, segments)?;
        if !matches!(slot, Value::Object(_) | Value::Array(_)) {
            *slot = empty_container(next_is_index);
        }
        cursor = slot;
    }

    if !matches!(cursor, Value::Object(_) | Value::Array(_)) {
        *cursor = empty_container(as_index(last).is_some());
    }
    *child_slot(cursor, last, segments)? = value;
    Ok(())
}

fn empty_container(array: bool) -> Value {
    if array {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

// Caller guarantees `container` is an object or array.
fn child_slot<'tree>(
    container: &'tree mut Value,
    segment: &str,
    segments: &[String],
) -> Result<&'tree mut Value> {
    match container {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(arr) => {
            let index = as_index(segment).ok_or_else(|| {
                Error::InvalidPath(format!(
                    "segment `{segment}` of {segments:?} addresses an array but is not an index"
                ))
            })?;
            if index == arr.len() {
                arr.push(Value::Null);
            }
            let len = arr.len();
            arr.get_mut(index).ok_or_else(|| {
                Error::InvalidPath(format!(
                    "index {index} of {segments:?} is past the end of an array of length {len}"
                ))
            })
        }
        _ => Err(Error::InvalidPath(format!(
            "segment `{segment}` of {segments:?} addresses a scalar"
        ))),
    }
}

/// Recursively reorder every mapping's keys lexicographically, including
/// mappings nested inside arrays.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Overlay `source` onto `target`. Objects merge key by key and arrays index
/// by index, recursively; anything else in `source` replaces what's in
/// `target`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => {
            for (i, value) in src.into_iter().enumerate() {
                match dst.get_mut(i) {
                    Some(existing) => deep_merge(existing, value),
                    None => dst.push(value),
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Fill keys missing from `target` with the entries of `defaults`. Keys
/// already present (even if `null`) are left alone.
pub fn fill_defaults(target: &mut Map<String, Value>, defaults: Map<String, Value>) {
    for (key, value) in defaults {
        target.entry(key).or_insert(value);
    }
}
