//! Field-by-field reading of wire maps.
//!
//! A [`FieldReader`] owns a copy of the map being decoded and removes every
//! key it consumes. Whatever is left at the end is the `extra` map a value
//! keeps for verbatim re-encoding. `null` values are never consumed: an
//! optional key holding `null` reads as absent and stays in `extra`.

use serde_json::{Map, Value};

use crate::errors::{ShapeError, ValidationError};
use crate::ids::{WireId, WireInt};

pub(crate) struct FieldReader {
    context: String,
    rest: Map<String, Value>,
}

impl FieldReader {
    pub(crate) fn new(context: impl Into<String>, data: &Map<String, Value>) -> Self {
        Self {
            context: context.into(),
            rest: data.clone(),
        }
    }

    pub(crate) fn context(&self) -> &str {
        &self.context
    }

    /// Whether the key holds a non-null value.
    pub(crate) fn has(&self, key: &str) -> bool {
        self.rest.get(key).is_some_and(|v| !v.is_null())
    }

    pub(crate) fn peek(&self, key: &str) -> Option<&Value> {
        self.rest.get(key).filter(|v| !v.is_null())
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        if self.has(key) {
            self.rest.remove(key)
        } else {
            None
        }
    }

    fn take_required(&mut self, key: &str) -> Result<Value, ShapeError> {
        self.take(key)
            .ok_or_else(|| ShapeError::missing(self.context.as_str(), key))
    }

    pub(crate) fn required_str(&mut self, key: &str) -> Result<String, ShapeError> {
        match self.take_required(key)? {
            Value::String(s) => Ok(s),
            other => Err(self.wrong(key, "a string", &other)),
        }
    }

    pub(crate) fn optional_str(&mut self, key: &str) -> Result<Option<String>, ShapeError> {
        match self.peek(key) {
            None => Ok(None),
            Some(Value::String(_)) => self.required_str(key).map(Some),
            Some(other) => Err(self.wrong(key, "a string", other)),
        }
    }

    pub(crate) fn required_id(&mut self, key: &str) -> Result<WireId, ShapeError> {
        let value = self.take_required(key)?;
        WireId::from_value(&self.context, key, &value)
    }

    pub(crate) fn optional_id(&mut self, key: &str) -> Result<Option<WireId>, ShapeError> {
        match self.peek(key) {
            None => Ok(None),
            Some(value) => {
                let id = WireId::from_value(&self.context, key, value)?;
                let _ = self.rest.remove(key);
                Ok(Some(id))
            }
        }
    }

    pub(crate) fn required_int(&mut self, key: &str) -> Result<WireInt, ShapeError> {
        let value = self.take_required(key)?;
        WireInt::from_value(&self.context, key, &value)
    }

    pub(crate) fn optional_int(&mut self, key: &str) -> Result<Option<WireInt>, ShapeError> {
        match self.peek(key) {
            None => Ok(None),
            Some(value) => {
                let n = WireInt::from_value(&self.context, key, value)?;
                let _ = self.rest.remove(key);
                Ok(Some(n))
            }
        }
    }

    pub(crate) fn required_map(&mut self, key: &str) -> Result<Map<String, Value>, ShapeError> {
        match self.take_required(key)? {
            Value::Object(map) => Ok(map),
            other => Err(self.wrong(key, "a map", &other)),
        }
    }

    pub(crate) fn required_array(&mut self, key: &str) -> Result<Vec<Value>, ShapeError> {
        match self.take_required(key)? {
            Value::Array(items) => Ok(items),
            other => Err(self.wrong(key, "an array", &other)),
        }
    }

    /// Remove and return a non-null value of any kind.
    pub(crate) fn optional_raw(&mut self, key: &str) -> Option<Value> {
        self.take(key)
    }

    /// The keys nobody consumed.
    pub(crate) fn finish(self) -> Map<String, Value> {
        self.rest
    }

    fn wrong(&self, key: &str, expected: &'static str, found: &Value) -> ShapeError {
        ShapeError::wrong_type(self.context.as_str(), key, expected, found)
    }
}

/// Append `extra` after the typed fields of an encoded map.
pub(crate) fn merge_extra(map: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        if !map.contains_key(key) {
            let _ = map.insert(key.clone(), value.clone());
        }
    }
}

/// Reject `extra` keys that would shadow a typed field on re-decode.
///
/// `modelled` pairs each typed key with whether its field is set. A set
/// field must not appear in `extra` at all. An unset one may appear only as
/// `null`, which is how [`FieldReader`] leaves it.
pub(crate) fn check_extra(
    kind: &str,
    extra: &Map<String, Value>,
    modelled: &[(&str, bool)],
) -> Result<(), ValidationError> {
    for &(key, set) in modelled {
        match extra.get(key) {
            Some(value) if set || !value.is_null() => {
                return Err(ValidationError::new(
                    kind,
                    key,
                    "also present among the unmodelled keys",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
