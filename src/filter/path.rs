//! Attribute Path Resolver (spec.md §4.3): resolves dotted attribute paths
//! against SCIM JSON resources. Attribute name matching is case-insensitive;
//! descending through a multi-valued attribute fans out element-wise.

use serde_json::Value;

use super::ast::AttrPath;
use super::eval::evaluate;

/// Case-insensitive field lookup on a JSON object.
pub fn get_field_ci<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

/// Resolve a path fully, for filter evaluation: fans out through every
/// array boundary a path segment crosses, including the terminal segment,
/// and applies any bracket selector attached to a segment before
/// continuing the descent.
pub fn resolve<'a>(resource: &'a Value, path: &AttrPath) -> Vec<&'a Value> {
    let mut current: Vec<&Value> = vec![resource];
    for segment in &path.segments {
        let mut next = Vec::new();
        for value in current {
            let Some(field) = get_field_ci(value, &segment.name) else {
                continue;
            };
            let candidates: Vec<&Value> = match field {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for candidate in candidates {
                if let Some(selector) = &segment.selector {
                    if !evaluate(selector, candidate) {
                        continue;
                    }
                }
                next.push(candidate);
            }
        }
        current = next;
    }
    current
}

/// Resolve the raw value(s) at a path without flattening the terminal
/// segment's array (if any). Used by [`super::ast::FilterNode::Complex`] to
/// obtain a multi-valued attribute's elements, and by the PATCH Applier to
/// locate an attribute container for mutation.
pub fn resolve_raw<'a>(resource: &'a Value, path: &AttrPath) -> Vec<&'a Value> {
    if path.segments.is_empty() {
        return vec![resource];
    }
    let mut current: Vec<&Value> = vec![resource];
    for (index, segment) in path.segments.iter().enumerate() {
        let is_last = index + 1 == path.segments.len();
        let mut next = Vec::new();
        for value in current {
            let Some(field) = get_field_ci(value, &segment.name) else {
                continue;
            };
            if is_last {
                next.push(field);
                continue;
            }
            match field {
                Value::Array(items) => next.extend(items.iter()),
                other => next.push(other),
            }
        }
        current = next;
    }
    current
}

/// Presence, per spec.md §4.4: not absent, not JSON null, not an empty
/// string or empty array.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
