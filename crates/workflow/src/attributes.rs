//! Conversion between step trees and the flat attribute representation.
//!
//! The resource schema stores steps as nested lists of objects:
//!
//! ```text
//! step[] {
//!   id, name, action,
//!   input[] { name, value, generated },
//!   inline_steps_input[] { name, step[] ... }
//! }
//! ```
//!
//! All dynamic-shape handling lives here; the rest of the crate works on
//! [`Step`] values. Optional keys that are missing or null take their zero
//! value.

use serde_json::{Map, Value, json};

use crate::diff::RestoredInput;
use crate::error::MalformedStateError;
use crate::step::{InlineInputGroup, Input, Provenance, Step};

/// Attribute key of the top-level step list.
pub const STEP_KEY: &str = "step";

type Result<T> = std::result::Result<T, MalformedStateError>;

/// Reads a `step` attribute list.
///
/// # Errors
///
/// Returns [`MalformedStateError`] naming the first path whose value does not
/// match the schema.
pub fn steps_from_attributes(value: &Value) -> Result<Vec<Step>> {
    read_steps(value, STEP_KEY)
}

/// Writes steps in the `step` attribute shape.
#[must_use]
pub fn steps_to_attributes(steps: &[Step]) -> Value {
    Value::Array(steps.iter().map(step_to_attributes).collect())
}

/// Inserts restored inputs into a `step` attribute value in place.
///
/// Only the `input` lists named by the restorations change; ids, unknown
/// values and every other key keep exactly what the plan proposed.
/// Restorations must be applied in the order they were recorded.
///
/// # Errors
///
/// Returns [`MalformedStateError`] if a restoration path does not lead to an
/// input list in `value`.
pub fn splice_restored_inputs(value: &mut Value, restored: &[RestoredInput]) -> Result<()> {
    for input in restored {
        let list = input_list_mut(value, &input.path)?;
        let at = input.index.min(list.len());
        list.insert(
            at,
            json!({
                "name": input.name,
                "value": input.value,
                "generated": true,
            }),
        );
    }
    Ok(())
}

/// Resolves a path such as `step.0.inline_steps_input.1.step.0.input`.
fn input_list_mut<'a>(root: &'a mut Value, path: &str) -> Result<&'a mut Vec<Value>> {
    let malformed = || MalformedStateError::new(path, "an input list");

    let mut segments = path.split('.');
    if segments.next() != Some(STEP_KEY) {
        return Err(malformed());
    }
    let segments: Vec<&str> = segments.collect();
    let Some((list_key, steps)) = segments.split_last() else {
        return Err(malformed());
    };

    let mut current = root;
    for segment in steps {
        current = match current {
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| malformed())?;
                items.get_mut(index).ok_or_else(malformed)?
            }
            Value::Object(object) => object.get_mut(*segment).ok_or_else(malformed)?,
            _ => return Err(malformed()),
        };
    }

    let list = current
        .as_object_mut()
        .ok_or_else(malformed)?
        .entry(*list_key)
        .or_insert(Value::Null);
    if list.is_null() {
        *list = Value::Array(Vec::new());
    }
    list.as_array_mut().ok_or_else(malformed)
}

fn step_to_attributes(step: &Step) -> Value {
    let inputs: Vec<Value> = step
        .inputs
        .iter()
        .map(|input| {
            json!({
                "name": input.name,
                "value": input.value,
                "generated": input.is_generated(),
            })
        })
        .collect();

    let groups: Vec<Value> = step
        .inline_input_groups
        .iter()
        .map(|group| {
            json!({
                "name": group.name,
                "step": steps_to_attributes(&group.steps),
            })
        })
        .collect();

    json!({
        "id": step.id,
        "name": step.name,
        "action": step.action_id,
        "input": inputs,
        "inline_steps_input": groups,
    })
}

fn read_steps(value: &Value, path: &str) -> Result<Vec<Step>> {
    list(value, path)?
        .iter()
        .enumerate()
        .map(|(index, item)| read_step(item, &format!("{path}.{index}")))
        .collect()
}

fn read_step(value: &Value, path: &str) -> Result<Step> {
    let object = object(value, path)?;

    let inputs = match object.get("input") {
        Some(inputs) => list(inputs, &format!("{path}.input"))?
            .iter()
            .enumerate()
            .map(|(index, item)| read_input(item, &format!("{path}.input.{index}")))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let inline_input_groups = match object.get("inline_steps_input") {
        Some(groups) => list(groups, &format!("{path}.inline_steps_input"))?
            .iter()
            .enumerate()
            .map(|(index, item)| read_group(item, &format!("{path}.inline_steps_input.{index}")))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(Step {
        id: optional_string(object, "id", path)?,
        name: required_string(object, "name", path)?,
        action_id: required_string(object, "action", path)?,
        inputs,
        inline_input_groups,
    })
}

fn read_input(value: &Value, path: &str) -> Result<Input> {
    let object = object(value, path)?;
    let generated = match object.get("generated") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(MalformedStateError::new(format!("{path}.generated"), "a bool")),
    };

    Ok(Input {
        name: required_string(object, "name", path)?,
        value: optional_string(object, "value", path)?,
        provenance: if generated {
            Provenance::ServerGenerated
        } else {
            Provenance::UserSpecified
        },
    })
}

fn read_group(value: &Value, path: &str) -> Result<InlineInputGroup> {
    let object = object(value, path)?;
    let steps = match object.get(STEP_KEY) {
        Some(steps) => read_steps(steps, &format!("{path}.{STEP_KEY}"))?,
        None => Vec::new(),
    };

    Ok(InlineInputGroup {
        name: required_string(object, "name", path)?,
        steps,
    })
}

fn list<'a>(value: &'a Value, path: &str) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        _ => Err(MalformedStateError::new(path, "a list")),
    }
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| MalformedStateError::new(path, "an object"))
}

fn required_string(object: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(MalformedStateError::new(format!("{path}.{key}"), "a string")),
    }
}

fn optional_string(object: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(MalformedStateError::new(format!("{path}.{key}"), "a string")),
    }
}
