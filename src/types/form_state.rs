use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Value;

/// Snapshot of every answer the client has entered, keyed by field name.
///
/// Lookups take dot-separated paths like `"deductions.foreignIncome"`.
/// Numeric segments index into lists, so `"dependants.0.firstName"`
/// reaches the first dependant's name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct FormState {
    fields: BTreeMap<String, Value>,
}

/// Returned when a JSON document other than an object is read as form state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("form state must be a JSON object, got {kind}")]
pub struct FormStateError {
    kind: &'static str,
}

impl FormState {
    /// Create an empty form state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path. Creates intermediate maps as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.fields, &segments, value);
    }

    /// Look up a value by dot-separated path. `None` means the field is absent.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = self.fields.get(segments.next()?)?;
        segments.try_fold(first, |current, segment| match current {
            Value::Map(map) => map.get(segment),
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Remove the value at a path, returning it. Only map segments are followed.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;
        let mut map = &mut self.fields;
        for segment in parents {
            match map.get_mut(*segment)? {
                Value::Map(nested) => map = nested,
                _ => return None,
            }
        }
        map.remove(*last)
    }

    /// Overlay every top-level field of `other` onto this state.
    pub fn merge(&mut self, other: FormState) {
        self.fields.extend(other.fields);
    }

    /// Whether the field is answered (see [`Value::is_present`]).
    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some_and(Value::is_present)
    }

    /// Loose truthiness of a field; absent fields are falsy.
    #[must_use]
    pub fn is_truthy(&self, path: &str) -> bool {
        self.get(path).is_some_and(Value::is_truthy)
    }

    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    #[must_use]
    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    /// The list stored at `path`, or an empty slice if absent or not a list.
    #[must_use]
    pub fn list(&self, path: &str) -> &[Value] {
        self.get(path).and_then(Value::as_list).unwrap_or(&[])
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over top-level fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert_recursive(map: &mut BTreeMap<String, Value>, segments: &[&str], value: Value) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), value);
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| Value::Map(BTreeMap::new()));
                Self::insert_into(entry, rest, value);
            }
        }
    }

    fn insert_into(target: &mut Value, segments: &[&str], value: Value) {
        if let Value::List(items) = target {
            if let Some((head, rest)) = segments.split_first() {
                if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    if rest.is_empty() {
                        *item = value;
                    } else {
                        Self::insert_into(item, rest, value);
                    }
                    return;
                }
            }
        }
        if !matches!(target, Value::Map(_)) {
            *target = Value::Map(BTreeMap::new());
        }
        if let Value::Map(nested) = target {
            Self::insert_recursive(nested, segments, value);
        }
    }
}

impl TryFrom<serde_json::Value> for FormState {
    type Error = FormStateError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        let kind = match &json {
            serde_json::Value::Object(_) => "object",
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
        };
        match Value::from_json(json) {
            Some(Value::Map(fields)) => Ok(Self { fields }),
            _ => Err(FormStateError { kind }),
        }
    }
}

impl From<BTreeMap<String, Value>> for FormState {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<FormState> for serde_json::Value {
    fn from(state: FormState) -> Self {
        Value::Map(state.fields).to_json()
    }
}
