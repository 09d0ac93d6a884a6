//! Event envelopes.
//!
//! Every payload carries a discriminator (`post_type`, or `type` in some
//! dumps). `message` and `message_sent` become a [`MessageEvent`]; every other
//! value (`meta_event`, `notice`, `request`, …) becomes a [`MetaEvent`].
//! Envelope keys the model does not name are kept in `extra` / `payload` and
//! re-emitted unchanged.

use std::fmt;

use serde_json::{Map, Value};

use crate::dispatch::DecodeContext;
use crate::errors::{DecodeError, ShapeError, ValidationError};
use crate::fields::{FieldReader, check_extra, merge_extra};
use crate::ids::{WireId, WireInt};
use crate::segments::{MessageSegment, Segment};

/// Discriminator values that route to [`MessageEvent`].
pub const MESSAGE_KINDS: [&str; 2] = ["message", "message_sent"];

fn is_message_kind(kind: &str) -> bool {
    MESSAGE_KINDS.contains(&kind)
}

/// Which key the discriminator was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KindKey {
    /// `post_type` (OneBot v11).
    PostType,
    /// `type` (some log dumps).
    Type,
}

impl KindKey {
    /// The wire key.
    pub fn key(self) -> &'static str {
        match self {
            Self::PostType => "post_type",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for KindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Discriminator keys an event's extra map must not repeat. `type` is free
/// once `post_type` is written, since decoding prefers `post_type`.
fn discriminator_keys(kind_key: Option<KindKey>) -> Vec<(&'static str, bool)> {
    match kind_key {
        Some(KindKey::PostType) => vec![("post_type", true)],
        Some(KindKey::Type) => vec![("post_type", false), ("type", true)],
        None => vec![("post_type", false), ("type", false)],
    }
}

/// Read the discriminator, preferring `post_type`.
fn read_kind(fields: &mut FieldReader) -> Result<Option<(KindKey, String)>, ShapeError> {
    for key in [KindKey::PostType, KindKey::Type] {
        if fields.has(key.key()) {
            return fields.required_str(key.key()).map(|kind| Some((key, kind)));
        }
    }
    Ok(None)
}

// ─────────────────────────────────────────────────────────────────────────────
// Sender
// ─────────────────────────────────────────────────────────────────────────────

/// Author of a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Sender {
    /// Author id (`sender.user_id`).
    pub user_id: WireId,
    /// Display name (`sender.nickname`).
    pub nickname: Option<String>,
    /// Other sender keys (`card`, `role`, …).
    pub extra: Map<String, Value>,
}

impl Sender {
    /// A sender with only an id.
    pub fn new(user_id: impl Into<WireId>) -> Self {
        Self {
            user_id: user_id.into(),
            nickname: None,
            extra: Map::new(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.as_str().is_empty() {
            return Err(ValidationError::new(
                "message event",
                "sender.user_id",
                "must not be empty",
            ));
        }
        check_extra(
            "sender",
            &self.extra,
            &[("user_id", true), ("nickname", self.nickname.is_some())],
        )
    }

    fn decode(map: &Map<String, Value>) -> Result<Self, ShapeError> {
        let mut fields = FieldReader::new("sender", map);
        let user_id = fields.required_id("user_id")?;
        let nickname = fields.optional_str("nickname")?;
        Ok(Self {
            user_id,
            nickname,
            extra: fields.finish(),
        })
    }

    /// Group card name, if the implementation sends one.
    pub fn card(&self) -> Option<&str> {
        self.extra
            .get("card")
            .and_then(Value::as_str)
            .filter(|card| !card.is_empty())
    }

    /// Group role (`owner`, `admin`, `member`).
    pub fn role(&self) -> Option<&str> {
        self.extra.get("role").and_then(Value::as_str)
    }

    /// Wire form.
    pub fn encode(&self) -> Value {
        let mut map = Map::new();
        let _ = map.insert("user_id".into(), self.user_id.to_value());
        if let Some(nickname) = &self.nickname {
            let _ = map.insert("nickname".into(), Value::String(nickname.clone()));
        }
        merge_extra(&mut map, &self.extra);
        Value::Object(map)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MessageEvent
// ─────────────────────────────────────────────────────────────────────────────

/// A chat message: envelope plus ordered segments.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEvent {
    /// Key the discriminator was read from. `None` for forward nodes that
    /// omitted it.
    pub kind_key: Option<KindKey>,
    /// Discriminator value (`message` or `message_sent`).
    pub raw_kind: String,
    /// Message id (`message_id`).
    pub event_id: Option<WireId>,
    /// Unix timestamp in seconds (`time`).
    pub timestamp: WireInt,
    /// Author.
    pub sender: Sender,
    /// Message body (`message`).
    pub segments: Vec<Segment>,
    /// Every other envelope key.
    pub extra: Map<String, Value>,
}

impl MessageEvent {
    /// A `message` event with the given timestamp, sender and segments.
    pub fn new(timestamp: i64, sender: Sender, segments: Vec<Segment>) -> Self {
        Self {
            kind_key: Some(KindKey::PostType),
            raw_kind: MESSAGE_KINDS[0].to_owned(),
            event_id: None,
            timestamp: WireInt::new(timestamp),
            sender,
            segments,
            extra: Map::new(),
        }
    }

    /// Set the message id.
    #[must_use]
    pub fn with_event_id(mut self, id: impl Into<WireId>) -> Self {
        self.event_id = Some(id.into());
        self
    }

    /// Set an envelope key kept in `extra` (`message_type`, `group_id`, …).
    /// A key the envelope models itself, such as `time`, makes
    /// [`validate`](Self::validate) fail.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let _ = self.extra.insert(key.into(), value);
        self
    }

    /// Decode an element of a forward's `content`. The discriminator is
    /// optional here; when present it must name a message kind.
    pub(crate) fn decode_node(
        map: &Map<String, Value>,
        cx: &mut DecodeContext<'_>,
    ) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("forward node", map);
        let (kind_key, raw_kind) = match read_kind(&mut fields)? {
            Some((key, kind)) => (Some(key), kind),
            None => (None, MESSAGE_KINDS[0].to_owned()),
        };
        if !is_message_kind(&raw_kind) {
            return Err(ShapeError::Malformed {
                context: "forward node".into(),
                message: format!("expected a message event, found `{raw_kind}`"),
            }
            .into());
        }
        Self::from_fields(fields, kind_key, raw_kind, cx)
    }

    fn from_fields(
        mut fields: FieldReader,
        kind_key: Option<KindKey>,
        raw_kind: String,
        cx: &mut DecodeContext<'_>,
    ) -> Result<Self, DecodeError> {
        let event_id = fields.optional_id("message_id")?;
        let timestamp = fields.required_int("time")?;
        let sender = Sender::decode(&fields.required_map("sender")?)?;
        let items = fields.required_array("message")?;
        let segments = cx.decode_segments(&items)?;
        let event = Self {
            kind_key,
            raw_kind,
            event_id,
            timestamp,
            sender,
            segments,
            extra: fields.finish(),
        };
        event.validate_envelope()?;
        Ok(event)
    }

    fn validate_envelope(&self) -> Result<(), ValidationError> {
        if self.timestamp.get() < 0 {
            return Err(ValidationError::new(
                "message event",
                "time",
                "must not be negative",
            ));
        }
        if !is_message_kind(&self.raw_kind)
            || (self.kind_key.is_none() && self.raw_kind != MESSAGE_KINDS[0])
        {
            return Err(ValidationError::new(
                "message event",
                "post_type",
                format!("`{}` does not decode as a message", self.raw_kind),
            ));
        }
        self.sender.validate()?;
        let mut modelled = discriminator_keys(self.kind_key);
        modelled.extend([
            ("message_id", self.event_id.is_some()),
            ("time", true),
            ("sender", true),
            ("message", true),
        ]);
        check_extra("message event", &self.extra, &modelled)
    }

    /// Check the envelope and every segment, recursing into forwards.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_envelope()?;
        for segment in &self.segments {
            segment.validate()?;
        }
        Ok(())
    }

    /// Wire form, using the discriminator key seen at decode time.
    pub fn encode(&self) -> Value {
        let mut map = Map::new();
        if let Some(key) = self.kind_key {
            let _ = map.insert(key.key().into(), Value::String(self.raw_kind.clone()));
        }
        if let Some(id) = &self.event_id {
            let _ = map.insert("message_id".into(), id.to_value());
        }
        let _ = map.insert("time".into(), self.timestamp.to_value());
        let _ = map.insert("sender".into(), self.sender.encode());
        let _ = map.insert(
            "message".into(),
            Value::Array(self.segments.iter().map(MessageSegment::encode).collect()),
        );
        merge_extra(&mut map, &self.extra);
        Value::Object(map)
    }

    fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    fn extra_id(&self, key: &str) -> Option<WireId> {
        self.extra
            .get(key)
            .and_then(|value| WireId::from_value("message event", key, value).ok())
    }

    /// `private` or `group`.
    pub fn message_type(&self) -> Option<&str> {
        self.extra_str("message_type")
    }

    /// `friend`, `normal`, `anonymous`, …
    pub fn sub_type(&self) -> Option<&str> {
        self.extra_str("sub_type")
    }

    /// Author id.
    pub fn user_id(&self) -> &WireId {
        &self.sender.user_id
    }

    /// Group the message was posted in.
    pub fn group_id(&self) -> Option<WireId> {
        self.extra_id("group_id")
    }

    /// Account that received (or sent) the message.
    pub fn self_id(&self) -> Option<WireId> {
        self.extra_id("self_id")
    }

    /// CQ-code rendering some implementations attach.
    pub fn raw_message(&self) -> Option<&str> {
        self.extra_str("raw_message")
    }

    /// Posted in a group.
    pub fn is_group(&self) -> bool {
        self.message_type() == Some("group")
    }

    /// Sent in a private chat.
    pub fn is_private(&self) -> bool {
        self.message_type() == Some("private")
    }

    /// Echo of a message the bot account sent itself.
    pub fn is_self_sent(&self) -> bool {
        self.raw_kind == "message_sent"
    }

    /// Concatenation of every text segment.
    pub fn plain_text(&self) -> String {
        self.segments.iter().filter_map(Segment::as_text).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MetaEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Any non-message event: lifecycle, heartbeat, notice, request.
#[derive(Clone, Debug, PartialEq)]
pub struct MetaEvent {
    /// Discriminator value (`meta_event`, `notice`, `request`, …).
    pub kind: String,
    /// Key the discriminator was read from.
    pub kind_key: KindKey,
    /// Message id some notices carry (`message_id`).
    pub event_id: Option<WireId>,
    /// Unix timestamp in seconds (`time`).
    pub timestamp: WireInt,
    /// Every other key.
    pub payload: Map<String, Value>,
}

impl MetaEvent {
    fn from_fields(
        mut fields: FieldReader,
        kind_key: KindKey,
        kind: String,
    ) -> Result<Self, DecodeError> {
        let event_id = fields.optional_id("message_id")?;
        let timestamp = fields.required_int("time")?;
        let event = Self {
            kind,
            kind_key,
            event_id,
            timestamp,
            payload: fields.finish(),
        };
        event.validate()?;
        Ok(event)
    }

    /// Check envelope constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timestamp.get() < 0 {
            return Err(ValidationError::new(&self.kind, "time", "must not be negative"));
        }
        if is_message_kind(&self.kind) {
            return Err(ValidationError::new(
                &self.kind,
                self.kind_key.key(),
                "message kinds decode as message events",
            ));
        }
        let mut modelled = discriminator_keys(Some(self.kind_key));
        modelled.extend([("message_id", self.event_id.is_some()), ("time", true)]);
        check_extra(&self.kind, &self.payload, &modelled)
    }

    /// Wire form.
    pub fn encode(&self) -> Value {
        let mut map = Map::new();
        let _ = map.insert(self.kind_key.key().into(), Value::String(self.kind.clone()));
        if let Some(id) = &self.event_id {
            let _ = map.insert("message_id".into(), id.to_value());
        }
        let _ = map.insert("time".into(), self.timestamp.to_value());
        merge_extra(&mut map, &self.payload);
        Value::Object(map)
    }

    /// The kind-specific type: `meta_event_type`, `notice_type` or
    /// `request_type` depending on [`kind`](Self::kind).
    pub fn detail_type(&self) -> Option<&str> {
        self.payload
            .get(&format!("{}_type", self.kind))
            .and_then(Value::as_str)
    }

    /// `sub_type`, e.g. `connect` for lifecycle events.
    pub fn sub_type(&self) -> Option<&str> {
        self.payload.get("sub_type").and_then(Value::as_str)
    }

    /// Account the event belongs to.
    pub fn self_id(&self) -> Option<WireId> {
        self.payload
            .get("self_id")
            .and_then(|value| WireId::from_value("meta event", "self_id", value).ok())
    }

    /// Heartbeat meta event.
    pub fn is_heartbeat(&self) -> bool {
        self.kind == "meta_event" && self.detail_type() == Some("heartbeat")
    }

    /// Lifecycle meta event.
    pub fn is_lifecycle(&self) -> bool {
        self.kind == "meta_event" && self.detail_type() == Some("lifecycle")
    }

    /// Heartbeat interval in milliseconds.
    pub fn interval(&self) -> Option<i64> {
        self.payload.get("interval").and_then(Value::as_i64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// `message` / `message_sent`.
    Message(MessageEvent),
    /// Everything else.
    Meta(MetaEvent),
}

impl Event {
    /// Route a top-level payload by its discriminator and decode it.
    pub(crate) fn decode(
        map: &Map<String, Value>,
        cx: &mut DecodeContext<'_>,
    ) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("event", map);
        let Some((kind_key, kind)) = read_kind(&mut fields)? else {
            return Err(ShapeError::missing("event", KindKey::PostType.key()).into());
        };
        if is_message_kind(&kind) {
            MessageEvent::from_fields(fields, Some(kind_key), kind, cx).map(Self::Message)
        } else {
            MetaEvent::from_fields(fields, kind_key, kind).map(Self::Meta)
        }
    }

    /// Discriminator value.
    pub fn kind(&self) -> &str {
        match self {
            Self::Message(e) => &e.raw_kind,
            Self::Meta(e) => &e.kind,
        }
    }

    /// Unix timestamp in seconds.
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Message(e) => e.timestamp.get(),
            Self::Meta(e) => e.timestamp.get(),
        }
    }

    /// The message event, if this is one.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::Message(e) => Some(e),
            Self::Meta(_) => None,
        }
    }

    /// The meta event, if this is one.
    pub fn as_meta(&self) -> Option<&MetaEvent> {
        match self {
            Self::Meta(e) => Some(e),
            Self::Message(_) => None,
        }
    }

    /// Consume into the message event, if this is one.
    pub fn into_message(self) -> Option<MessageEvent> {
        match self {
            Self::Message(e) => Some(e),
            Self::Meta(_) => None,
        }
    }

    /// Check every constraint of the tree.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Message(e) => e.validate(),
            Self::Meta(e) => e.validate(),
        }
    }

    /// Wire form.
    pub fn encode(&self) -> Value {
        match self {
            Self::Message(e) => e.encode(),
            Self::Meta(e) => e.encode(),
        }
    }
}

impl From<MessageEvent> for Event {
    fn from(event: MessageEvent) -> Self {
        Self::Message(event)
    }
}

impl From<MetaEvent> for Event {
    fn from(event: MetaEvent) -> Self {
        Self::Meta(event)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ParseOptions;
    use crate::errors::DecodeReport;
    use crate::registry::SegmentRegistry;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn decode(value: &Value) -> Result<Event, DecodeError> {
        let Value::Object(map) = value else {
            panic!("fixture must be a map")
        };
        let registry = SegmentRegistry::new();
        let options = ParseOptions::default();
        let mut report = DecodeReport::new();
        let mut cx = DecodeContext::new(&registry, &options, &mut report);
        Event::decode(map, &mut cx)
    }

    fn group_message() -> Value {
        json!({
            "self_id": 3_000_000_001_u64,
            "user_id": 10001,
            "time": 1_700_000_000,
            "message_id": 1_234_567,
            "message_type": "group",
            "sub_type": "normal",
            "group_id": 987_654,
            "sender": {"user_id": 10001, "nickname": "alice", "card": "", "role": "admin"},
            "raw_message": "hi[CQ:face,id=14]",
            "font": 14,
            "message": [
                {"type": "text", "data": {"text": "hi"}},
                {"type": "face", "data": {"id": "14"}}
            ],
            "post_type": "message"
        })
    }

    #[test]
    fn message_event_accessors() {
        let event = decode(&group_message()).unwrap().into_message().unwrap();
        assert_eq!(event.kind_key, Some(KindKey::PostType));
        assert!(event.is_group());
        assert!(!event.is_private());
        assert!(!event.is_self_sent());
        assert_eq!(event.sub_type(), Some("normal"));
        assert_eq!(event.user_id(), "10001");
        assert_eq!(event.group_id().unwrap(), "987654");
        assert_eq!(event.self_id().unwrap(), "3000000001");
        assert_eq!(event.raw_message(), Some("hi[CQ:face,id=14]"));
        assert_eq!(event.sender.nickname.as_deref(), Some("alice"));
        assert_eq!(event.sender.card(), None);
        assert_eq!(event.sender.role(), Some("admin"));
        assert_eq!(event.plain_text(), "hi");
        assert_eq!(event.segments.len(), 2);
    }

    #[test]
    fn message_event_roundtrip() {
        let input = group_message();
        let event = decode(&input).unwrap();
        assert_eq!(event.encode(), input);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn message_sent_is_a_message() {
        let mut input = group_message();
        input["post_type"] = json!("message_sent");
        let event = decode(&input).unwrap();
        assert_eq!(event.kind(), "message_sent");
        assert!(event.as_message().unwrap().is_self_sent());
    }

    #[test]
    fn type_key_is_accepted_and_kept() {
        let mut input = group_message();
        let _ = input.as_object_mut().unwrap().remove("post_type");
        input["type"] = json!("message");
        let event = decode(&input).unwrap();
        assert_eq!(event.as_message().unwrap().kind_key, Some(KindKey::Type));
        assert_eq!(event.encode(), input);
    }

    #[test]
    fn missing_discriminator_is_shape_error() {
        let mut input = group_message();
        let _ = input.as_object_mut().unwrap().remove("post_type");
        assert_matches!(
            decode(&input),
            Err(DecodeError::Shape(ShapeError::MissingKey { key, .. })) if key == "post_type"
        );
    }

    #[test]
    fn missing_envelope_fields_are_shape_errors() {
        for key in ["time", "sender", "message"] {
            let mut input = group_message();
            let _ = input.as_object_mut().unwrap().remove(key);
            assert_matches!(
                decode(&input),
                Err(DecodeError::Shape(ShapeError::MissingKey { key: missing, .. })) if missing == key,
                "removing {key}"
            );
        }
        let mut input = group_message();
        input["sender"] = json!({"nickname": "x"});
        assert_matches!(decode(&input), Err(DecodeError::Shape(_)));
    }

    #[test]
    fn negative_time_fails_validation() {
        let mut input = group_message();
        input["time"] = json!(-5);
        assert_matches!(decode(&input), Err(DecodeError::Validation(e)) if e.field == "time");
    }

    #[test]
    fn empty_sender_fails_validation() {
        let mut input = group_message();
        input["sender"]["user_id"] = json!("");
        assert_matches!(
            decode(&input),
            Err(DecodeError::Validation(e)) if e.field == "sender.user_id"
        );
    }

    #[test]
    fn heartbeat_is_meta() {
        let input = json!({
            "time": 1_700_000_000,
            "self_id": 3_000_000_001_u64,
            "post_type": "meta_event",
            "meta_event_type": "heartbeat",
            "status": {"online": true, "good": true},
            "interval": 30_000
        });
        let event = decode(&input).unwrap();
        let meta = event.as_meta().unwrap();
        assert!(meta.is_heartbeat());
        assert!(!meta.is_lifecycle());
        assert_eq!(meta.interval(), Some(30_000));
        assert_eq!(meta.self_id().unwrap(), "3000000001");
        assert_eq!(event.encode(), input);
    }

    #[test]
    fn notice_detail_type() {
        let input = json!({
            "time": 1_700_000_000,
            "post_type": "notice",
            "notice_type": "group_recall",
            "group_id": 1,
            "message_id": -2_147_483_000
        });
        let event = decode(&input).unwrap();
        let meta = event.as_meta().unwrap();
        assert_eq!(meta.detail_type(), Some("group_recall"));
        assert_eq!(meta.event_id.as_ref().unwrap(), "-2147483000");
        assert_eq!(event.timestamp(), 1_700_000_000);
        assert_eq!(event.encode(), input);
    }

    #[test]
    fn built_event_encodes() {
        let event = MessageEvent::new(10, Sender::new("42").with_nickname("n"), vec![Segment::text("a")])
            .with_event_id(7_i64)
            .with_extra("message_type", json!("private"));
        assert!(event.is_private());
        assert_eq!(
            event.encode(),
            json!({
                "post_type": "message",
                "message_id": 7,
                "time": 10,
                "sender": {"user_id": "42", "nickname": "n"},
                "message": [{"type": "text", "data": {"text": "a"}}],
                "message_type": "private"
            })
        );
    }

    #[test]
    fn built_event_extra_cannot_shadow_envelope() {
        let base = || MessageEvent::new(10, Sender::new("42"), vec![Segment::text("a")]);
        assert_matches!(
            base().with_extra("time", json!(5)).validate(),
            Err(e) if e.kind == "message event" && e.field == "time"
        );
        assert!(base().with_extra("type", json!("notice")).validate().is_ok());
        assert!(base().with_extra("message_id", Value::Null).validate().is_ok());
        assert_matches!(
            base().with_event_id(7_i64).with_extra("message_id", Value::Null).validate(),
            Err(e) if e.field == "message_id"
        );

        let mut event = base();
        let _ = event.sender.extra.insert("nickname".into(), json!("ghost"));
        assert_matches!(event.validate(), Err(e) if e.kind == "sender" && e.field == "nickname");

        let mut event = base();
        event.kind_key = None;
        event.raw_kind = "message_sent".into();
        assert_matches!(event.validate(), Err(e) if e.field == "post_type");
    }

    #[test]
    fn both_discriminators_roundtrip() {
        let mut input = group_message();
        input["type"] = json!("legacy");
        let event = decode(&input).unwrap();
        assert!(event.validate().is_ok());
        assert_eq!(event.encode(), input);

        let mut message = event.into_message().unwrap();
        message.kind_key = Some(KindKey::Type);
        let _ = message.extra.remove("type");
        let _ = message.extra.insert("post_type".into(), json!("notice"));
        assert_matches!(message.validate(), Err(e) if e.field == "post_type");
    }

    #[test]
    fn meta_event_extra_and_kind_are_checked() {
        let meta = MetaEvent {
            kind: "notice".into(),
            kind_key: KindKey::PostType,
            event_id: None,
            timestamp: WireInt::new(1),
            payload: Map::new(),
        };
        assert!(meta.validate().is_ok());

        let mut shadowed = meta.clone();
        let _ = shadowed.payload.insert("time".into(), json!(2));
        assert_matches!(shadowed.validate(), Err(e) if e.field == "time");

        let mut message_kind = meta;
        message_kind.kind = "message".into();
        assert_matches!(message_kind.validate(), Err(e) if e.field == "post_type");
    }
}
