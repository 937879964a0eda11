//! PATCH Applier (spec.md §4.6): applies a `PatchOperation` list to a
//! resource in place.
//!
//! Rather than building a generalized mutable path-handle abstraction over
//! `serde_json::Value` (parent handle + key + value, as a fully general
//! resolver would), mutation is done with a direct in-place walk here,
//! sharing case-insensitive field matching with the read-only resolver in
//! [`crate::filter::path`]. A selector is only supported on the final
//! segment of a path, optionally followed by one sub-attribute
//! (`emails[type eq "work"].value`) — the shape every SCIM PATCH path in
//! practice takes.

use serde_json::Value;

use crate::error::{PatchError, PatchResult};
use crate::filter::ast::{AttrPath, PathSegment};
use crate::filter::eval::evaluate;

use super::op::{PatchOp, PatchOperation};
use super::path::parse_patch_path;

const IMMUTABLE: [&str; 3] = ["schemas", "id", "meta"];

/// Apply every operation in order. The first failing operation aborts the
/// whole batch; callers are expected to apply to a clone and only commit on
/// success.
pub fn apply(resource: &mut Value, operations: &[PatchOperation]) -> PatchResult<()> {
    for operation in operations {
        apply_one(resource, operation)?;
    }
    Ok(())
}

fn apply_one(resource: &mut Value, operation: &PatchOperation) -> PatchResult<()> {
    let raw_path = operation.path.as_deref().unwrap_or("");
    let path = parse_patch_path(raw_path)?;
    check_mutability(&path)?;

    match operation.op {
        PatchOp::Add => apply_add(resource, &path, operation.value.clone()),
        PatchOp::Replace => apply_replace(resource, &path, operation.value.clone()),
        PatchOp::Remove => apply_remove(resource, &path),
    }
}

fn check_mutability(path: &AttrPath) -> PatchResult<()> {
    if let Some(first) = path.segments.first() {
        if IMMUTABLE.iter().any(|a| a.eq_ignore_ascii_case(&first.name)) {
            return Err(PatchError::Mutability {
                attribute: first.name.clone(),
            });
        }
    }
    Ok(())
}

fn apply_add(resource: &mut Value, path: &AttrPath, value: Option<Value>) -> PatchResult<()> {
    let value = value.ok_or_else(|| PatchError::InvalidPath {
        message: "add requires a value".to_string(),
    })?;

    if path.segments.is_empty() {
        return merge_root(resource, value, true);
    }
    navigate_write(resource, &path.segments, value, true)
}

fn apply_replace(resource: &mut Value, path: &AttrPath, value: Option<Value>) -> PatchResult<()> {
    let value = value.ok_or_else(|| PatchError::InvalidPath {
        message: "replace requires a value".to_string(),
    })?;

    if path.segments.is_empty() {
        return merge_root(resource, value, false);
    }
    navigate_write(resource, &path.segments, value, false)
}

fn apply_remove(resource: &mut Value, path: &AttrPath) -> PatchResult<()> {
    if path.segments.is_empty() {
        return Err(PatchError::InvalidPath {
            message: "remove requires a path".to_string(),
        });
    }
    navigate_remove(resource, &path.segments)
}

/// A no-`path` `add`/`replace`: the value is an object whose top-level
/// attributes are each applied individually, per RFC 7644 §3.5.2.
fn merge_root(resource: &mut Value, value: Value, is_add: bool) -> PatchResult<()> {
    let object = value.as_object().cloned().ok_or_else(|| PatchError::InvalidPath {
        message: "root add/replace value must be an object".to_string(),
    })?;
    for (key, val) in object {
        if IMMUTABLE.iter().any(|a| a.eq_ignore_ascii_case(&key)) {
            return Err(PatchError::Mutability { attribute: key });
        }
        let segment = PathSegment {
            name: key,
            selector: None,
        };
        navigate_write(resource, std::slice::from_ref(&segment), val, is_add)?;
    }
    Ok(())
}

fn navigate_write(
    current: &mut Value,
    segments: &[PathSegment],
    value: Value,
    is_add: bool,
) -> PatchResult<()> {
    let (segment, rest) = segments
        .split_first()
        .expect("navigate_write called with empty segment slice");

    if current.is_null() {
        *current = Value::Object(Default::default());
    }

    if let Some(selector) = &segment.selector {
        let array = ensure_array_field(current, &segment.name)?;
        let matches: Vec<usize> = array
            .iter()
            .enumerate()
            .filter(|(_, element)| evaluate(selector, element))
            .map(|(index, _)| index)
            .collect();
        if matches.is_empty() {
            return if is_add { Err(PatchError::NoTarget) } else { Ok(()) };
        }
        for index in matches {
            if rest.is_empty() {
                merge_value(&mut array[index], value.clone())?;
            } else {
                navigate_write(&mut array[index], rest, value.clone(), is_add)?;
            }
        }
        return Ok(());
    }

    if rest.is_empty() {
        return set_leaf(current, &segment.name, value, is_add);
    }

    let field = field_mut_or_insert(current, &segment.name)?;
    navigate_write(field, rest, value, is_add)
}

fn navigate_remove(current: &mut Value, segments: &[PathSegment]) -> PatchResult<()> {
    let (segment, rest) = segments
        .split_first()
        .expect("navigate_remove called with empty segment slice");
    let object = current.as_object_mut().ok_or(PatchError::NoTarget)?;
    let existing_key = object
        .keys()
        .find(|k| k.eq_ignore_ascii_case(&segment.name))
        .cloned();
    let Some(key) = existing_key else {
        return Err(PatchError::NoTarget);
    };

    if let Some(selector) = &segment.selector {
        let array = object
            .get_mut(&key)
            .and_then(Value::as_array_mut)
            .ok_or(PatchError::NoTarget)?;
        let matched: Vec<usize> = array
            .iter()
            .enumerate()
            .filter(|(_, element)| evaluate(selector, element))
            .map(|(index, _)| index)
            .collect();
        if matched.is_empty() {
            // remove on a selector matching nothing is a silent no-op.
            return Ok(());
        }
        if rest.is_empty() {
            for &index in matched.iter().rev() {
                array.remove(index);
            }
        } else {
            for &index in &matched {
                navigate_remove(&mut array[index], rest)?;
            }
        }
        return Ok(());
    }

    if rest.is_empty() {
        object.remove(&key);
        return Ok(());
    }
    navigate_remove(object.get_mut(&key).expect("key just found"), rest)
}

fn field_mut_or_insert<'a>(value: &'a mut Value, name: &str) -> PatchResult<&'a mut Value> {
    let object = value.as_object_mut().ok_or_else(|| PatchError::InvalidPath {
        message: "path segment does not address an object".to_string(),
    })?;
    if !object.keys().any(|k| k.eq_ignore_ascii_case(name)) {
        object.insert(name.to_string(), Value::Null);
    }
    let key = object
        .keys()
        .find(|k| k.eq_ignore_ascii_case(name))
        .cloned()
        .expect("just inserted or already present");
    Ok(object.get_mut(&key).expect("key just resolved"))
}

fn ensure_array_field<'a>(value: &'a mut Value, name: &str) -> PatchResult<&'a mut Vec<Value>> {
    let field = field_mut_or_insert(value, name)?;
    if field.is_null() {
        *field = Value::Array(vec![]);
    }
    field.as_array_mut().ok_or_else(|| PatchError::InvalidPath {
        message: format!("attribute '{name}' is not multi-valued"),
    })
}

fn set_leaf(parent: &mut Value, name: &str, value: Value, is_add: bool) -> PatchResult<()> {
    let object = parent.as_object_mut().ok_or_else(|| PatchError::InvalidPath {
        message: "path segment does not address an object".to_string(),
    })?;
    let existing_key = object.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned();

    if is_add {
        if let Some(key) = &existing_key {
            if let Some(Value::Array(items)) = object.get_mut(key) {
                match value {
                    Value::Array(new_items) => items.extend(new_items),
                    other => items.push(other),
                }
                return Ok(());
            }
        }
    }

    let key = existing_key.unwrap_or_else(|| name.to_string());
    object.insert(key, value);
    Ok(())
}

fn merge_value(target: &mut Value, value: Value) -> PatchResult<()> {
    match (target.as_object_mut(), value) {
        (Some(object), Value::Object(incoming)) => {
            for (key, val) in incoming {
                let existing_key = object.keys().find(|k| k.eq_ignore_ascii_case(&key)).cloned();
                let key = existing_key.unwrap_or(key);
                object.insert(key, val);
            }
            Ok(())
        }
        (_, value) => {
            *target = value;
            Ok(())
        }
    }
}
