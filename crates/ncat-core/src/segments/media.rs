//! Image, record, video and file segments.
//!
//! The four media tags share one payload shape. Each references its content
//! through exactly one resource key:
//!
//! | key | variant |
//! |---|---|
//! | `url` | [`Resource::Url`] |
//! | `path` | [`Resource::Path`] |
//! | `base64` | [`Resource::Base64`] |
//! | `file_id` | [`Resource::Id`] |

use serde_json::{Map, Value};

use super::MessageSegment;
use crate::errors::{DecodeError, ShapeError, ValidationError};
use crate::fields::{FieldReader, check_extra, merge_extra};
use crate::ids::WireInt;

/// Which media tag a [`Media`] segment carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `image`
    Image,
    /// `record` (voice message)
    Record,
    /// `video`
    Video,
    /// `file`
    File,
}

impl MediaKind {
    /// Wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Record => "record",
            Self::Video => "video",
            Self::File => "file",
        }
    }

    /// Map a wire tag to a media kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "image" => Some(Self::Image),
            "record" => Some(Self::Record),
            "video" => Some(Self::Video),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Where the media content lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    /// Remote URL.
    Url(String),
    /// Local filesystem path.
    Path(String),
    /// Inline base64 payload.
    Base64(String),
    /// Server-side file id.
    Id(String),
}

impl Resource {
    /// Resource keys in lookup order.
    pub const KEYS: [&'static str; 4] = ["url", "path", "base64", "file_id"];

    /// The wire key this resource is stored under.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Path(_) => "path",
            Self::Base64(_) => "base64",
            Self::Id(_) => "file_id",
        }
    }

    /// The reference itself.
    pub fn value(&self) -> &str {
        match self {
            Self::Url(v) | Self::Path(v) | Self::Base64(v) | Self::Id(v) => v,
        }
    }

    fn from_key(key: &str, value: String) -> Option<Self> {
        match key {
            "url" => Some(Self::Url(value)),
            "path" => Some(Self::Path(value)),
            "base64" => Some(Self::Base64(value)),
            "file_id" => Some(Self::Id(value)),
            _ => None,
        }
    }
}

/// Shared payload of the media segment family.
#[derive(Clone, Debug, PartialEq)]
pub struct Media {
    /// Which media tag this is.
    pub kind: MediaKind,
    /// The one content reference.
    pub resource: Resource,
    /// Display file name (`data.file`).
    pub name: Option<String>,
    /// Size in bytes (`data.file_size`).
    pub size: Option<WireInt>,
    /// Preview text such as `[图片]` (`data.summary`).
    pub summary: Option<String>,
    /// Unmodelled `data` keys, including kind-specific ones like `sub_type`.
    pub extra: Map<String, Value>,
}

impl Media {
    /// Create a media segment with only a resource.
    pub fn new(kind: MediaKind, resource: Resource) -> Self {
        Self {
            kind,
            resource,
            name: None,
            size: None,
            summary: None,
            extra: Map::new(),
        }
    }

    /// Set the display file name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Decode and validate the `data` map of a media tag.
    pub fn decode(kind: MediaKind, data: &Map<String, Value>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new(format!("{} segment", kind.tag()), data);

        let present: Vec<&str> = Resource::KEYS
            .iter()
            .copied()
            .filter(|key| fields.has(key))
            .collect();
        let key = match present.as_slice() {
            [key] => *key,
            [] => {
                return Err(ShapeError::MissingResource {
                    context: fields.context().to_owned(),
                    candidates: Resource::KEYS.iter().map(|k| (*k).to_owned()).collect(),
                }
                .into());
            }
            _ => {
                return Err(ShapeError::ConflictingKeys {
                    context: fields.context().to_owned(),
                    keys: present.iter().map(|k| (*k).to_owned()).collect(),
                }
                .into());
            }
        };
        let value = fields.required_str(key)?;
        let resource = Resource::from_key(key, value).ok_or_else(|| ShapeError::Malformed {
            context: fields.context().to_owned(),
            message: format!("unsupported resource key `{key}`"),
        })?;

        let name = fields.optional_str("file")?;
        let size = fields.optional_int("file_size")?;
        let summary = fields.optional_str("summary")?;

        let media = Self {
            kind,
            resource,
            name,
            size,
            summary,
            extra: fields.finish(),
        };
        media.validate()?;
        Ok(media)
    }

    /// Image sub type (0 = normal picture, 1 = sticker), if present.
    pub fn sub_type(&self) -> Option<i64> {
        self.extra.get("sub_type").and_then(Value::as_i64)
    }

    /// Whether a voice record uses the voice-changer effect.
    pub fn magic(&self) -> Option<bool> {
        match self.extra.get("magic")? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        }
    }
}

impl MessageSegment for Media {
    fn kind(&self) -> &str {
        self.kind.tag()
    }

    fn encode_data(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            let _ = map.insert("file".into(), Value::String(name.clone()));
        }
        let _ = map.insert(
            self.resource.key().into(),
            Value::String(self.resource.value().to_owned()),
        );
        if let Some(size) = self.size {
            let _ = map.insert("file_size".into(), size.to_value());
        }
        if let Some(summary) = &self.summary {
            let _ = map.insert("summary".into(), Value::String(summary.clone()));
        }
        merge_extra(&mut map, &self.extra);
        map
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut modelled: Vec<(&str, bool)> = Resource::KEYS
            .iter()
            .map(|&key| (key, key == self.resource.key()))
            .collect();
        modelled.extend([
            ("file", self.name.is_some()),
            ("file_size", self.size.is_some()),
            ("summary", self.summary.is_some()),
        ]);
        check_extra(self.kind.tag(), &self.extra, &modelled)?;
        if self.resource.value().is_empty() {
            return Err(ValidationError::new(
                self.kind.tag(),
                self.resource.key(),
                "must not be empty",
            ));
        }
        if self.kind == MediaKind::Image {
            if let Some(sub_type) = self.extra.get("sub_type") {
                if !sub_type.is_null() && sub_type.as_i64().is_none() {
                    return Err(ValidationError::new(
                        self.kind.tag(),
                        "sub_type",
                        "must be an integer",
                    ));
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
