//! Wire-tolerant identifier and integer types.
//!
//! Protocol implementations disagree on whether ids and timestamps travel as
//! JSON numbers or strings. [`WireId`] and [`WireInt`] accept both spellings
//! and remember which one they saw, so re-encoding reproduces the original
//! payload byte-for-byte in that field.
//!
//! | type | accepts | rejects |
//! |---|---|---|
//! | [`WireId`] | any string, any integer | float, bool, null, array, map |
//! | [`WireInt`] | integer in `i64` range, canonical decimal string | everything else |

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::ShapeError;

// ─────────────────────────────────────────────────────────────────────────────
// WireId
// ─────────────────────────────────────────────────────────────────────────────

/// An identifier that may arrive as a string or as an integer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WireId {
    value: String,
    numeric: bool,
}

impl WireId {
    /// An id that is spelled as a JSON string on the wire.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            numeric: false,
        }
    }

    /// An id that is spelled as a JSON integer on the wire.
    #[must_use]
    pub fn number(value: i64) -> Self {
        Self {
            value: value.to_string(),
            numeric: true,
        }
    }

    /// Coerce a wire value.
    pub fn from_value(context: &str, key: &str, value: &Value) -> Result<Self, ShapeError> {
        match value {
            Value::String(s) => Ok(Self::text(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self {
                value: n.to_string(),
                numeric: true,
            }),
            other => Err(ShapeError::wrong_type(
                context,
                key,
                "a string or integer",
                other,
            )),
        }
    }

    /// Re-emit in the spelling it was read with.
    #[must_use]
    pub fn to_value(&self) -> Value {
        if self.numeric {
            if let Ok(n) = self.value.parse::<i64>() {
                return Value::from(n);
            }
            if let Ok(n) = self.value.parse::<u64>() {
                return Value::from(n);
            }
        }
        Value::String(self.value.clone())
    }

    /// The textual value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether the id travelled as a JSON number.
    #[must_use]
    pub fn is_numeric_on_wire(&self) -> bool {
        self.numeric
    }

    /// Non-empty and made only of ASCII decimal digits.
    #[must_use]
    pub fn is_digits(&self) -> bool {
        !self.value.is_empty() && self.value.bytes().all(|b| b.is_ascii_digit())
    }

    /// Parse as a signed integer, if it is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.value.parse().ok()
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for WireId {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl PartialEq<str> for WireId {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}

impl PartialEq<&str> for WireId {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}

impl From<&str> for WireId {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for WireId {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<i64> for WireId {
    fn from(n: i64) -> Self {
        Self::number(n)
    }
}

impl From<u64> for WireId {
    fn from(n: u64) -> Self {
        Self {
            value: n.to_string(),
            numeric: true,
        }
    }
}

impl Serialize for WireId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value("id", "id", &value).map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WireInt
// ─────────────────────────────────────────────────────────────────────────────

/// An integer that may arrive as a JSON number or a decimal string.
///
/// Strings must be canonical (`"42"`, `"-7"`, not `"+42"` or `"042"`) so the
/// quoted form can be reproduced exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WireInt {
    value: i64,
    quoted: bool,
}

impl WireInt {
    /// An integer spelled as a JSON number.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self {
            value,
            quoted: false,
        }
    }

    /// An integer spelled as a JSON string.
    #[must_use]
    pub fn quoted(value: i64) -> Self {
        Self {
            value,
            quoted: true,
        }
    }

    /// Coerce a wire value.
    pub fn from_value(context: &str, key: &str, value: &Value) -> Result<Self, ShapeError> {
        const EXPECTED: &str = "an integer or a decimal string";
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::new)
                .ok_or_else(|| ShapeError::wrong_type(context, key, EXPECTED, value)),
            Value::String(s) => match s.parse::<i64>() {
                Ok(n) if n.to_string() == *s => Ok(Self::quoted(n)),
                _ => Err(ShapeError::Malformed {
                    context: context.to_owned(),
                    message: format!("key `{key}` holds non-canonical integer text {s:?}"),
                }),
            },
            other => Err(ShapeError::wrong_type(context, key, EXPECTED, other)),
        }
    }

    /// Re-emit in the spelling it was read with.
    #[must_use]
    pub fn to_value(self) -> Value {
        if self.quoted {
            Value::String(self.value.to_string())
        } else {
            Value::from(self.value)
        }
    }

    /// The integer value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.value
    }

    /// Whether the integer travelled as a string.
    #[must_use]
    pub fn is_quoted(self) -> bool {
        self.quoted
    }
}

impl fmt::Display for WireInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<i64> for WireInt {
    fn from(n: i64) -> Self {
        Self::new(n)
    }
}

impl Serialize for WireInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value("integer", "value", &value).map_err(serde::de::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
