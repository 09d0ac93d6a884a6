//! Opaque-payload segments and the unknown-kind placeholder.

use serde_json::{Map, Value};

use super::MessageSegment;
use crate::errors::ValidationError;

// ─────────────────────────────────────────────────────────────────────────────
// Misc
// ─────────────────────────────────────────────────────────────────────────────

/// Known segment kinds whose `data` is kept as an opaque map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MiscKind {
    /// Structured card (`data.data` holds a JSON string).
    Json,
    /// XML card.
    Xml,
    /// Markdown block.
    Markdown,
    /// Poke / nudge.
    Poke,
    /// Dice roll.
    Dice,
    /// Rock-paper-scissors.
    Rps,
    /// Window shake.
    Shake,
    /// Music card.
    Music,
    /// Link share.
    Share,
    /// Map location.
    Location,
    /// Contact or group recommendation.
    Contact,
    /// Anonymous-send marker.
    Anonymous,
    /// Market sticker.
    Mface,
}

impl MiscKind {
    /// Every misc kind.
    pub const ALL: [Self; 13] = [
        Self::Json,
        Self::Xml,
        Self::Markdown,
        Self::Poke,
        Self::Dice,
        Self::Rps,
        Self::Shake,
        Self::Music,
        Self::Share,
        Self::Location,
        Self::Contact,
        Self::Anonymous,
        Self::Mface,
    ];

    /// Wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Markdown => "markdown",
            Self::Poke => "poke",
            Self::Dice => "dice",
            Self::Rps => "rps",
            Self::Shake => "shake",
            Self::Music => "music",
            Self::Share => "share",
            Self::Location => "location",
            Self::Contact => "contact",
            Self::Anonymous => "anonymous",
            Self::Mface => "mface",
        }
    }

    /// Map a wire tag to a misc kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

/// A known kind whose payload is preserved verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct Misc {
    /// Which kind this is.
    pub kind: MiscKind,
    /// The `data` map as received.
    pub payload: Map<String, Value>,
}

impl Misc {
    /// Wrap a payload.
    pub fn new(kind: MiscKind, payload: Map<String, Value>) -> Self {
        Self { kind, payload }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// `data.title` (share, music, contact cards).
    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    /// `data.url` (share, music).
    pub fn url(&self) -> Option<&str> {
        self.str_field("url")
    }

    /// The card document of a `json` segment, parsed from its `data.data`
    /// string. `None` for other kinds or when the string is not JSON.
    pub fn json_data(&self) -> Option<Value> {
        if self.kind != MiscKind::Json {
            return None;
        }
        match self.payload.get("data")? {
            Value::String(s) => serde_json::from_str(s).ok(),
            Value::Object(_) => self.payload.get("data").cloned(),
            _ => None,
        }
    }

    /// Music platform (`qq`, `163`, `custom`, …) stored in `data.type`.
    pub fn music_platform(&self) -> Option<&str> {
        if self.kind != MiscKind::Music {
            return None;
        }
        self.str_field("type")
    }
}

impl MessageSegment for Misc {
    fn kind(&self) -> &str {
        self.kind.tag()
    }

    fn encode_data(&self) -> Map<String, Value> {
        self.payload.clone()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unknown
// ─────────────────────────────────────────────────────────────────────────────

/// A segment that could not be decoded into a typed variant.
///
/// Holds the entire original segment map (`type`, `data` and anything else)
/// and re-emits it unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct Unknown {
    /// The segment map as received.
    pub raw: Map<String, Value>,
}

impl Unknown {
    /// Keep a segment map verbatim.
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }
}

impl MessageSegment for Unknown {
    fn kind(&self) -> &str {
        self.raw.get("type").and_then(Value::as_str).unwrap_or("")
    }

    fn encode_data(&self) -> Map<String, Value> {
        match self.raw.get("data") {
            Some(Value::Object(data)) => data.clone(),
            _ => Map::new(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self.raw.get("type") {
            Some(Value::String(_)) => Ok(()),
            _ => Err(ValidationError::new(
                "unknown segment",
                "type",
                "must be a string",
            )),
        }
    }

    fn encode(&self) -> Value {
        Value::Object(self.raw.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
