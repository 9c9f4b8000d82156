//! Conversion between [`Value`] graphs and `serde_json` documents.

use std::collections::HashSet;

use serde_json::{Map, Number};

use super::{ObjectId, ObjectRef, PropertyKey, Value};
use crate::error::{Error, Result};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Longest array a snapshot will materialise, holes included.
pub const MAX_SNAPSHOT_ARRAY_LEN: usize = 1 << 24;

impl Value {
    /// Build a fresh raw object graph from a JSON document.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Object(ObjectRef::from_values(items.into_iter().map(Value::from_json)))
            }
            serde_json::Value::Object(entries) => Value::Object(ObjectRef::from_entries(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from_json(value))),
            )),
        }
    }

    /// Snapshot this value as JSON.
    ///
    /// Views are read through their raw object, so taking a snapshot never
    /// records dependencies. Follows `JSON.stringify` conventions: only
    /// enumerable string keys are emitted, `undefined` properties are
    /// skipped, and non-finite numbers become `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut visiting = HashSet::new();
        snapshot(self, &mut visiting)
    }
}

/// Integral numbers become JSON integers, non-finite ones `null`.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

fn snapshot(value: &Value, visiting: &mut HashSet<ObjectId>) -> Result<serde_json::Value> {
    let object = match value {
        Value::Undefined | Value::Null => return Ok(serde_json::Value::Null),
        Value::Bool(b) => return Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => return Ok(number_to_json(*n)),
        Value::String(s) => return Ok(serde_json::Value::String(s.to_string())),
        Value::Object(object) => object.clone(),
        Value::View(view) => view.raw().clone(),
    };

    if object.is_array() && object.len() > MAX_SNAPSHOT_ARRAY_LEN {
        return Err(Error::ArrayTooLong(object.len() as u64));
    }
    if !visiting.insert(object.id()) {
        return Err(Error::Cycle(object.id().raw()));
    }

    let result = if object.is_array() {
        (0..object.len())
            .map(|index| {
                let item = object
                    .own_descriptor(&PropertyKey::from(index))
                    .map(|descriptor| descriptor.value)
                    .unwrap_or_default();
                snapshot(&item, visiting)
            })
            .collect::<Result<Vec<_>>>()
            .map(serde_json::Value::Array)
    } else {
        let mut map = Map::new();
        for key in object.own_keys() {
            let Some(name) = key.as_str() else { continue };
            let Some(descriptor) = object.own_descriptor(&key) else { continue };
            if !descriptor.flags.enumerable || descriptor.value.is_undefined() {
                continue;
            }
            map.insert(name.to_string(), snapshot(&descriptor.value, visiting)?);
        }
        Ok(serde_json::Value::Object(map))
    };

    visiting.remove(&object.id());
    result
}
