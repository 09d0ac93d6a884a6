//! Text, mention, face and reply segments.

use serde_json::{Map, Value};

use super::MessageSegment;
use crate::errors::{DecodeError, ValidationError};
use crate::fields::{FieldReader, check_extra, merge_extra};
use crate::ids::{WireId, WireInt};

// ─────────────────────────────────────────────────────────────────────────────
// Text
// ─────────────────────────────────────────────────────────────────────────────

/// A run of plain text.
#[derive(Clone, Debug, PartialEq)]
pub struct Text {
    /// The text (`data.text`).
    pub content: String,
    /// Unmodelled `data` keys.
    pub extra: Map<String, Value>,
}

impl Text {
    /// Wire tag.
    pub const TAG: &'static str = "text";

    /// Create a text segment.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            extra: Map::new(),
        }
    }

    /// Decode the `data` map.
    pub fn decode(data: &Map<String, Value>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("text segment", data);
        let content = fields.required_str("text")?;
        Ok(Self {
            content,
            extra: fields.finish(),
        })
    }
}

impl MessageSegment for Text {
    fn kind(&self) -> &str {
        Self::TAG
    }

    fn encode_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let _ = map.insert("text".into(), Value::String(self.content.clone()));
        merge_extra(&mut map, &self.extra);
        map
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_extra(Self::TAG, &self.extra, &[("text", true)])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// At
// ─────────────────────────────────────────────────────────────────────────────

/// A mention of one user, or of everyone in the group.
#[derive(Clone, Debug, PartialEq)]
pub struct At {
    /// User id or the literal `"all"` (`data.qq`).
    pub target: WireId,
    /// Unmodelled `data` keys (display `name`, …).
    pub extra: Map<String, Value>,
}

impl At {
    /// Wire tag.
    pub const TAG: &'static str = "at";

    /// The target value that mentions everyone.
    pub const ALL: &'static str = "all";

    /// Mention a user id.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: WireId::text(target),
            extra: Map::new(),
        }
    }

    /// Mention everyone.
    pub fn all() -> Self {
        Self::new(Self::ALL)
    }

    /// Decode and validate the `data` map.
    pub fn decode(data: &Map<String, Value>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("at segment", data);
        let target = fields.required_id("qq")?;
        let at = Self {
            target,
            extra: fields.finish(),
        };
        at.validate()?;
        Ok(at)
    }

    /// Whether this mentions everyone.
    pub fn is_all(&self) -> bool {
        self.target == Self::ALL
    }

    /// Display name some implementations attach to the mention.
    pub fn name(&self) -> Option<&str> {
        self.extra.get("name").and_then(Value::as_str)
    }
}

impl MessageSegment for At {
    fn kind(&self) -> &str {
        Self::TAG
    }

    fn encode_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let _ = map.insert("qq".into(), self.target.to_value());
        merge_extra(&mut map, &self.extra);
        map
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_extra(Self::TAG, &self.extra, &[("qq", true)])?;
        if self.is_all() || self.target.is_digits() {
            Ok(())
        } else {
            Err(ValidationError::new(
                Self::TAG,
                "qq",
                format!("must be \"all\" or decimal digits, got {:?}", self.target.as_str()),
            ))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Face
// ─────────────────────────────────────────────────────────────────────────────

/// A built-in emoji.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    /// Emoji id (`data.id`).
    pub id: WireInt,
    /// Unmodelled `data` keys.
    pub extra: Map<String, Value>,
}

impl Face {
    /// Wire tag.
    pub const TAG: &'static str = "face";

    /// Create a face segment.
    pub fn new(id: i64) -> Self {
        Self {
            id: WireInt::new(id),
            extra: Map::new(),
        }
    }

    /// Decode and validate the `data` map.
    pub fn decode(data: &Map<String, Value>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("face segment", data);
        let id = fields.required_int("id")?;
        let face = Self {
            id,
            extra: fields.finish(),
        };
        face.validate()?;
        Ok(face)
    }
}

impl MessageSegment for Face {
    fn kind(&self) -> &str {
        Self::TAG
    }

    fn encode_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let _ = map.insert("id".into(), self.id.to_value());
        merge_extra(&mut map, &self.extra);
        map
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_extra(Self::TAG, &self.extra, &[("id", true)])?;
        if self.id.get() < 0 {
            return Err(ValidationError::new(Self::TAG, "id", "must not be negative"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reply
// ─────────────────────────────────────────────────────────────────────────────

/// A quote of an earlier message.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    /// Id of the quoted message (`data.id`).
    pub message_id: WireId,
    /// Unmodelled `data` keys.
    pub extra: Map<String, Value>,
}

impl Reply {
    /// Wire tag.
    pub const TAG: &'static str = "reply";

    /// Quote a message id.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: WireId::text(message_id),
            extra: Map::new(),
        }
    }

    /// Decode and validate the `data` map.
    pub fn decode(data: &Map<String, Value>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("reply segment", data);
        let message_id = fields.required_id("id")?;
        let reply = Self {
            message_id,
            extra: fields.finish(),
        };
        reply.validate()?;
        Ok(reply)
    }
}

impl MessageSegment for Reply {
    fn kind(&self) -> &str {
        Self::TAG
    }

    fn encode_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let _ = map.insert("id".into(), self.message_id.to_value());
        merge_extra(&mut map, &self.extra);
        map
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_extra(Self::TAG, &self.extra, &[("id", true)])?;
        if self.message_id.as_str().is_empty() {
            return Err(ValidationError::new(Self::TAG, "id", "must not be empty"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ShapeError;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("fixture must be a map"),
        }
    }

    #[test]
    fn text_roundtrip_keeps_extra() {
        let input = data(json!({"text": "hi", "style": "bold"}));
        let text = Text::decode(&input).unwrap();
        assert_eq!(text.content, "hi");
        assert_eq!(text.encode_data(), input);
    }

    #[test]
    fn text_requires_string() {
        assert_matches!(
            Text::decode(&data(json!({}))),
            Err(DecodeError::Shape(ShapeError::MissingKey { .. }))
        );
        assert_matches!(
            Text::decode(&data(json!({"text": 5}))),
            Err(DecodeError::Shape(ShapeError::WrongType { .. }))
        );
    }

    #[test]
    fn at_accepts_all_and_digits() {
        assert!(At::all().validate().is_ok());
        assert!(At::all().is_all());
        assert!(At::new("123456").validate().is_ok());
    }

    #[test]
    fn at_rejects_letters_and_empty() {
        let err = At::new("abc").validate().unwrap_err();
        assert_eq!(err.kind, "at");
        assert_eq!(err.field, "qq");
        assert!(At::new("").validate().is_err());
        assert_matches!(
            At::decode(&data(json!({"qq": "abc"}))),
            Err(DecodeError::Validation(_))
        );
    }

    #[test]
    fn at_keeps_numeric_spelling() {
        let input = data(json!({"qq": 123_456, "name": "alice"}));
        let at = At::decode(&input).unwrap();
        assert_eq!(at.target, "123456");
        assert_eq!(at.name(), Some("alice"));
        assert_eq!(at.encode_data(), input);
    }

    #[test]
    fn face_rejects_negative() {
        assert!(Face::new(14).validate().is_ok());
        assert_matches!(
            Face::decode(&data(json!({"id": -1}))),
            Err(DecodeError::Validation(e)) if e.field == "id"
        );
    }

    #[test]
    fn face_accepts_quoted_id() {
        let input = data(json!({"id": "14"}));
        let face = Face::decode(&input).unwrap();
        assert_eq!(face.id.get(), 14);
        assert_eq!(face.encode_data(), input);
    }

    #[test]
    fn reply_requires_non_empty_id() {
        assert!(Reply::new("42").validate().is_ok());
        assert_matches!(
            Reply::decode(&data(json!({"id": ""}))),
            Err(DecodeError::Validation(_))
        );
        let input = data(json!({"id": 987_654}));
        assert_eq!(Reply::decode(&input).unwrap().encode_data(), input);
    }

    #[test]
    fn extra_cannot_repeat_the_typed_key() {
        let mut text = Text::new("typed");
        let _ = text.extra.insert("text".into(), json!("shadow"));
        assert_matches!(text.validate(), Err(e) if e.kind == "text" && e.field == "text");

        let mut at = At::new("10001");
        let _ = at.extra.insert("qq".into(), json!("all"));
        assert_matches!(at.validate(), Err(e) if e.field == "qq");

        let mut reply = Reply::new("42");
        let _ = reply.extra.insert("id".into(), Value::Null);
        assert!(reply.validate().is_err());

        let mut face = Face::new(1);
        let _ = face.extra.insert("name".into(), json!("smile"));
        assert!(face.validate().is_ok());
    }

    mod proptests {
        use super::*;

        proptest! {
            #[test]
            fn at_digits_always_valid(target in "[0-9]{1,12}") {
                prop_assert!(At::new(target).validate().is_ok());
            }

            #[test]
            fn at_with_non_digit_is_invalid(prefix in "[0-9]{0,4}", bad in "[a-zA-Z _-]", suffix in "[0-9]{0,4}") {
                let target = format!("{prefix}{bad}{suffix}");
                prop_assume!(target != "all");
                prop_assert!(At::new(target).validate().is_err());
            }

            #[test]
            fn text_roundtrips(content in ".*") {
                let text = Text::new(content);
                prop_assert_eq!(Text::decode(&text.encode_data()).unwrap(), text);
            }
        }
    }
}
