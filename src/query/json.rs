use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{Patch, Selector};
use crate::error::BoxError;

/// Error raised while evaluating a document query or patch.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("record is not representable as a document: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("patched document no longer fits the record type: {0}")]
    Shape(serde_json::Error),
}

/// Field-equality selector evaluated against a record's JSON form.
///
/// Field paths use dots to reach into nested objects (`"address.city"`). A
/// record matches when every listed field is present and equal. An empty
/// query matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldQuery {
    fields: BTreeMap<String, Value>,
}

impl FieldQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(path.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Evaluate against an already serialized document.
    pub fn matches_document(&self, document: &Value) -> bool {
        self.fields
            .iter()
            .all(|(path, expected)| document.pointer(&to_pointer(path)) == Some(expected))
    }
}

impl<T: Serialize> Selector<T> for FieldQuery {
    fn matches(&self, record: &T) -> Result<bool, BoxError> {
        if self.fields.is_empty() {
            return Ok(true);
        }
        let document = serde_json::to_value(record).map_err(QueryError::Serde)?;
        Ok(self.matches_document(&document))
    }
}

fn to_pointer(path: &str) -> String {
    let mut pointer = String::with_capacity(path.len() + 1);
    for segment in path.split('.') {
        pointer.push('/');
        pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    pointer
}

/// JSON merge patch (RFC 7396) applied to a record's JSON form.
///
/// Objects merge recursively, `null` removes a field, anything else replaces
/// the target value. The merged document must deserialize back into the
/// record type or the patch fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergePatch {
    patch: Value,
}

impl MergePatch {
    pub fn new(patch: Value) -> Self {
        Self { patch }
    }

    pub fn as_value(&self) -> &Value {
        &self.patch
    }

    /// Merge into a document in place.
    pub fn merge_into(&self, target: &mut Value) {
        merge(target, &self.patch);
    }
}

impl From<Value> for MergePatch {
    fn from(patch: Value) -> Self {
        Self::new(patch)
    }
}

impl<T: Serialize + DeserializeOwned> Patch<T> for MergePatch {
    fn apply(&self, record: &mut T) -> Result<(), BoxError> {
        let mut document = serde_json::to_value(&*record).map_err(QueryError::Serde)?;
        self.merge_into(&mut document);
        *record = serde_json::from_value(document).map_err(QueryError::Shape)?;
        Ok(())
    }
}

fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    if let Value::Object(fields) = target {
        for (key, value) in entries {
            if value.is_null() {
                fields.remove(key);
            } else {
                merge(fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
