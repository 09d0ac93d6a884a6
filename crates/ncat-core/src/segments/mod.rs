//! Message segment types.
//!
//! A message is an ordered list of segments. On the wire every segment is a
//! `{"type": <tag>, "data": {...}}` map. Built-in tags decode into the closed
//! [`Segment`] sum type; tags handled by a collaborator-registered decoder
//! become [`Segment::Extension`]; anything else is kept verbatim as
//! [`Segment::Unknown`].
//!
//! Every variant implements [`MessageSegment`], the shared contract of
//! `kind` + `encode` + `validate`.

mod forward;
mod media;
mod misc;
mod primitives;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::dispatch::DecodeContext;
use crate::errors::{DecodeError, ValidationError};
use crate::event::MessageEvent;

pub use forward::{Forward, Node, NodeContent};
pub use media::{Media, MediaKind, Resource};
pub use misc::{Misc, MiscKind, Unknown};
pub use primitives::{At, Face, Reply, Text};

// ─────────────────────────────────────────────────────────────────────────────
// Base contract
// ─────────────────────────────────────────────────────────────────────────────

/// Capability set every segment variant provides.
///
/// Object safe, so collaborator-supplied segment types can live behind
/// `Arc<dyn MessageSegment>` in [`Segment::Extension`].
pub trait MessageSegment: fmt::Debug + Send + Sync {
    /// Wire tag (`"text"`, `"image"`, …).
    fn kind(&self) -> &str;

    /// The `data` map of the wire form.
    fn encode_data(&self) -> Map<String, Value>;

    /// Check the variant's field constraints.
    fn validate(&self) -> Result<(), ValidationError>;

    /// The full wire form, `{"type": kind, "data": encode_data()}`.
    fn encode(&self) -> Value {
        let mut map = Map::new();
        let _ = map.insert("type".into(), Value::String(self.kind().to_owned()));
        let _ = map.insert("data".into(), Value::Object(self.encode_data()));
        Value::Object(map)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extension
// ─────────────────────────────────────────────────────────────────────────────

/// A segment produced by a registered extension decoder.
///
/// Two extensions are equal when they share a tag and encode to the same
/// `data` map.
#[derive(Clone, Debug)]
pub struct Extension(Arc<dyn MessageSegment>);

impl Extension {
    /// Wrap a collaborator segment.
    pub fn new(inner: Arc<dyn MessageSegment>) -> Self {
        Self(inner)
    }

    /// The wrapped segment.
    pub fn inner(&self) -> &dyn MessageSegment {
        self.0.as_ref()
    }
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind() && self.0.encode_data() == other.0.encode_data()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Segment
// ─────────────────────────────────────────────────────────────────────────────

/// One piece of a message, in display order.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// Plain text run.
    Text(Text),
    /// @-mention of a user or everyone.
    At(At),
    /// Built-in emoji.
    Face(Face),
    /// Quote of an earlier message.
    Reply(Reply),
    /// Image, voice record, video or file.
    Media(Media),
    /// Known kind with an opaque payload.
    Misc(Misc),
    /// Forwarded conversation.
    Forward(Forward),
    /// Custom forward node.
    Node(Node),
    /// Collaborator-registered kind.
    Extension(Extension),
    /// Unrecognized or undecodable segment, kept verbatim.
    Unknown(Unknown),
}

/// Every tag the closed sum type decodes itself. Registering any of these
/// with the [`SegmentRegistry`](crate::SegmentRegistry) is rejected.
pub const BUILTIN_TAGS: &[&str] = &[
    Text::TAG,
    At::TAG,
    Face::TAG,
    Reply::TAG,
    "image",
    "record",
    "video",
    "file",
    Forward::TAG,
    Node::TAG,
    "json",
    "xml",
    "markdown",
    "poke",
    "dice",
    "rps",
    "shake",
    "music",
    "share",
    "location",
    "contact",
    "anonymous",
    "mface",
];

/// Whether `tag` is decoded by a built-in variant.
#[must_use]
pub fn is_builtin_tag(tag: &str) -> bool {
    BUILTIN_TAGS.contains(&tag)
}

/// Decode the `data` map of a built-in tag. `None` if the tag is not built in.
pub(crate) fn decode_builtin(
    tag: &str,
    data: &Map<String, Value>,
    cx: &mut DecodeContext<'_>,
) -> Option<Result<Segment, DecodeError>> {
    let decoded = match tag {
        Text::TAG => Text::decode(data).map(Segment::Text),
        At::TAG => At::decode(data).map(Segment::At),
        Face::TAG => Face::decode(data).map(Segment::Face),
        Reply::TAG => Reply::decode(data).map(Segment::Reply),
        Forward::TAG => Forward::decode(data, cx).map(Segment::Forward),
        Node::TAG => Node::decode(data, cx).map(Segment::Node),
        other => {
            if let Some(kind) = MediaKind::from_tag(other) {
                Media::decode(kind, data).map(Segment::Media)
            } else {
                let kind = MiscKind::from_tag(other)?;
                Ok(Segment::Misc(Misc::new(kind, data.clone())))
            }
        }
    };
    Some(decoded)
}

impl Segment {
    /// Text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(Text::new(content))
    }

    /// Mention of one user.
    pub fn at(target: impl Into<String>) -> Self {
        Self::At(At::new(target))
    }

    /// Mention of everyone.
    pub fn at_all() -> Self {
        Self::At(At::all())
    }

    /// Built-in emoji.
    pub fn face(id: i64) -> Self {
        Self::Face(Face::new(id))
    }

    /// Quote of an earlier message.
    pub fn reply(message_id: impl Into<String>) -> Self {
        Self::Reply(Reply::new(message_id))
    }

    /// Image from a resource reference.
    pub fn image(resource: Resource) -> Self {
        Self::Media(Media::new(MediaKind::Image, resource))
    }

    /// Forward of complete message events.
    pub fn forward(nodes: Vec<MessageEvent>) -> Self {
        Self::Forward(Forward::with_nodes(nodes))
    }

    /// Keep an arbitrary segment map verbatim.
    pub fn unknown(raw: Map<String, Value>) -> Self {
        Self::Unknown(Unknown::new(raw))
    }

    /// The text if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.content),
            _ => None,
        }
    }

    /// Whether this is the unknown-kind placeholder.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    fn inner(&self) -> &dyn MessageSegment {
        match self {
            Self::Text(s) => s,
            Self::At(s) => s,
            Self::Face(s) => s,
            Self::Reply(s) => s,
            Self::Media(s) => s,
            Self::Misc(s) => s,
            Self::Forward(s) => s,
            Self::Node(s) => s,
            Self::Extension(s) => s.inner(),
            Self::Unknown(s) => s,
        }
    }
}

impl MessageSegment for Segment {
    fn kind(&self) -> &str {
        self.inner().kind()
    }

    fn encode_data(&self) -> Map<String, Value> {
        self.inner().encode_data()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.inner().validate()
    }

    fn encode(&self) -> Value {
        self.inner().encode()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
