//! Forwarded conversations.
//!
//! A `forward` segment carries complete message events in `data.content`,
//! each of which may itself contain further forwards. A `node` segment is the
//! custom single-message form used when composing a forward. Inline content of
//! either enters one nesting level of the dispatcher's depth guard.

use serde_json::{Map, Value};

use super::{MessageSegment, Segment};
use crate::dispatch::DecodeContext;
use crate::errors::{DecodeError, ShapeError, ValidationError};
use crate::event::MessageEvent;
use crate::fields::{FieldReader, check_extra, merge_extra};
use crate::ids::WireId;

// ─────────────────────────────────────────────────────────────────────────────
// Forward
// ─────────────────────────────────────────────────────────────────────────────

/// A forwarded conversation.
#[derive(Clone, Debug, PartialEq)]
pub struct Forward {
    /// Server-side forward id (`data.id`).
    pub id: Option<WireId>,
    /// Forwarded messages in order (`data.content`). `None` when the wire
    /// carried no content, e.g. a forward referenced only by id.
    pub nodes: Option<Vec<MessageEvent>>,
    /// Unmodelled `data` keys.
    pub extra: Map<String, Value>,
}

impl Forward {
    /// Wire tag.
    pub const TAG: &'static str = "forward";

    /// A forward holding its messages inline.
    pub fn with_nodes(nodes: Vec<MessageEvent>) -> Self {
        Self {
            id: None,
            nodes: Some(nodes),
            extra: Map::new(),
        }
    }

    /// A forward referenced only by its server id.
    pub fn by_id(id: impl Into<WireId>) -> Self {
        Self {
            id: Some(id.into()),
            nodes: None,
            extra: Map::new(),
        }
    }

    /// Decode the `data` map, decoding every node as a message event.
    pub fn decode(data: &Map<String, Value>, cx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("forward segment", data);
        let id = fields.optional_id("id")?;
        let nodes = if fields.has("content") {
            let items = fields.required_array("content")?;
            Some(cx.nested(|cx| {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| match item {
                        Value::Object(node) => MessageEvent::decode_node(node, cx),
                        other => {
                            Err(ShapeError::not_a_map(format!("forward node {index}"), other).into())
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
            })?)
        } else {
            None
        };
        Ok(Self {
            id,
            nodes,
            extra: fields.finish(),
        })
    }

    /// Number of inline nodes (0 when content is absent).
    pub fn len(&self) -> usize {
        self.nodes.as_ref().map_or(0, Vec::len)
    }

    /// Whether there are no inline nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nesting levels decoding this segment takes from the depth guard.
    /// A forward without inline content takes none.
    pub fn nesting_depth(&self) -> usize {
        self.nodes.as_ref().map_or(0, |nodes| {
            1 + nodes
                .iter()
                .map(|node| nesting_depth_of(&node.segments))
                .max()
                .unwrap_or(0)
        })
    }
}

/// Deepest forward/node nesting among `segments`.
pub(crate) fn nesting_depth_of(segments: &[Segment]) -> usize {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Forward(forward) => forward.nesting_depth(),
            Segment::Node(node) => node.nesting_depth(),
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

impl MessageSegment for Forward {
    fn kind(&self) -> &str {
        Self::TAG
    }

    fn encode_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(id) = &self.id {
            let _ = map.insert("id".into(), id.to_value());
        }
        if let Some(nodes) = &self.nodes {
            let _ = map.insert(
                "content".into(),
                Value::Array(nodes.iter().map(MessageEvent::encode).collect()),
            );
        }
        merge_extra(&mut map, &self.extra);
        map
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_extra(
            Self::TAG,
            &self.extra,
            &[("id", self.id.is_some()), ("content", self.nodes.is_some())],
        )?;
        for node in self.nodes.iter().flatten() {
            node.validate()?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// Body of a custom forward node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeContent {
    /// Nested message segments.
    Segments(Vec<Segment>),
    /// Plain-text shorthand.
    Text(String),
}

impl NodeContent {
    fn to_value(&self) -> Value {
        match self {
            Self::Segments(segments) => {
                Value::Array(segments.iter().map(MessageSegment::encode).collect())
            }
            Self::Text(text) => Value::String(text.clone()),
        }
    }
}

/// One message of a forward being composed.
///
/// Either references an existing message by `id` or carries its own
/// `content` with a display identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Existing message id (`data.id`).
    pub id: Option<WireId>,
    /// Displayed author (`data.user_id`).
    pub user_id: Option<WireId>,
    /// Displayed author name (`data.nickname`).
    pub nickname: Option<String>,
    /// Message body (`data.content`).
    pub content: Option<NodeContent>,
    /// Unmodelled `data` keys.
    pub extra: Map<String, Value>,
}

impl Node {
    /// Wire tag.
    pub const TAG: &'static str = "node";

    /// A node referencing an existing message.
    pub fn reference(id: impl Into<WireId>) -> Self {
        Self {
            id: Some(id.into()),
            user_id: None,
            nickname: None,
            content: None,
            extra: Map::new(),
        }
    }

    /// A node with its own author and segments.
    pub fn custom(
        user_id: impl Into<WireId>,
        nickname: impl Into<String>,
        segments: Vec<Segment>,
    ) -> Self {
        Self {
            id: None,
            user_id: Some(user_id.into()),
            nickname: Some(nickname.into()),
            content: Some(NodeContent::Segments(segments)),
            extra: Map::new(),
        }
    }

    /// Nesting levels decoding this segment takes from the depth guard.
    /// Only segment content takes a level.
    pub fn nesting_depth(&self) -> usize {
        match &self.content {
            Some(NodeContent::Segments(segments)) => 1 + nesting_depth_of(segments),
            Some(NodeContent::Text(_)) | None => 0,
        }
    }

    /// Decode and validate the `data` map. Segment content is decoded one
    /// nesting level down.
    pub fn decode(data: &Map<String, Value>, cx: &mut DecodeContext<'_>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new("node segment", data);
        let id = fields.optional_id("id")?;
        let user_id = fields.optional_id("user_id")?;
        let nickname = fields.optional_str("nickname")?;
        let content = match fields.peek("content") {
            None => None,
            Some(Value::String(_)) => fields.optional_str("content")?.map(NodeContent::Text),
            Some(Value::Array(_)) => {
                let items = fields.required_array("content")?;
                let segments = cx.nested(|cx| cx.decode_segments(&items))?;
                Some(NodeContent::Segments(segments))
            }
            Some(other) => {
                return Err(ShapeError::wrong_type(
                    fields.context(),
                    "content",
                    "an array of segments or a string",
                    other,
                )
                .into());
            }
        };
        let node = Self {
            id,
            user_id,
            nickname,
            content,
            extra: fields.finish(),
        };
        node.validate()?;
        Ok(node)
    }
}

impl MessageSegment for Node {
    fn kind(&self) -> &str {
        Self::TAG
    }

    fn encode_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(id) = &self.id {
            let _ = map.insert("id".into(), id.to_value());
        }
        if let Some(user_id) = &self.user_id {
            let _ = map.insert("user_id".into(), user_id.to_value());
        }
        if let Some(nickname) = &self.nickname {
            let _ = map.insert("nickname".into(), Value::String(nickname.clone()));
        }
        if let Some(content) = &self.content {
            let _ = map.insert("content".into(), content.to_value());
        }
        merge_extra(&mut map, &self.extra);
        map
    }

    fn validate(&self) -> Result<(), ValidationError> {
        check_extra(
            Self::TAG,
            &self.extra,
            &[
                ("id", self.id.is_some()),
                ("user_id", self.user_id.is_some()),
                ("nickname", self.nickname.is_some()),
                ("content", self.content.is_some()),
            ],
        )?;
        if self.id.is_none() && self.content.is_none() {
            return Err(ValidationError::new(
                Self::TAG,
                "content",
                "a node needs either an id or content",
            ));
        }
        if let Some(user_id) = &self.user_id {
            if !user_id.is_digits() {
                return Err(ValidationError::new(
                    Self::TAG,
                    "user_id",
                    "must be decimal digits",
                ));
            }
        }
        if let Some(NodeContent::Segments(segments)) = &self.content {
            for segment in segments {
                segment.validate()?;
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
