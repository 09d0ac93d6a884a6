//! Error taxonomy for decoding, validating and dispatching events.
//!
//! - [`ShapeError`]: a structural element is missing or has the wrong kind
//! - [`ValidationError`]: a well-shaped field violates a semantic constraint
//! - [`DecodeError`]: anything that stops one segment (or nested event) from
//!   decoding; always recovered into an unknown-kind placeholder
//! - [`ExtractionError`]: raised by the log-line extraction collaborator
//! - [`ParseError`]: what the dispatcher hands back to its caller
//! - [`RegistryError`]: extension registration policy violations
//!
//! [`DecodeReport`] collects the segment-level failures the dispatcher
//! recovered from, so no fallback goes unrecorded.

use serde_json::Value;
use thiserror::Error;

/// Short name of a JSON value's kind, used in error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ShapeError
// ─────────────────────────────────────────────────────────────────────────────

/// A required structural element is absent or of the wrong fundamental shape.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// A required key is absent (or `null`).
    #[error("{context}: missing required key `{key}`")]
    MissingKey {
        /// Where the key was expected (e.g. `"at segment"`).
        context: String,
        /// The missing key.
        key: String,
    },

    /// A key is present but holds the wrong kind of value.
    #[error("{context}: key `{key}` must be {expected}, found {found}")]
    WrongType {
        /// Where the key was read.
        context: String,
        /// The offending key.
        key: String,
        /// Human description of the accepted shapes.
        expected: &'static str,
        /// Kind of the value actually found.
        found: &'static str,
    },

    /// A value that must be a map is something else.
    #[error("{context} must be a map, found {found}")]
    NotAMap {
        /// What was being read.
        context: String,
        /// Kind of the value actually found.
        found: &'static str,
    },

    /// More than one mutually exclusive resource key is populated.
    #[error("{context}: conflicting resource keys {keys:?}")]
    ConflictingKeys {
        /// Where the keys were read.
        context: String,
        /// Every populated resource key, in lookup order.
        keys: Vec<String>,
    },

    /// None of the resource keys is populated.
    #[error("{context}: none of the resource keys {candidates:?} is present")]
    MissingResource {
        /// Where the keys were read.
        context: String,
        /// Keys that would have been accepted.
        candidates: Vec<String>,
    },

    /// Free-form structural problem.
    #[error("{context}: {message}")]
    Malformed {
        /// What was being read.
        context: String,
        /// What went wrong.
        message: String,
    },
}

impl ShapeError {
    /// A required key is missing.
    pub fn missing(context: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingKey {
            context: context.into(),
            key: key.into(),
        }
    }

    /// A key holds a value of the wrong kind.
    pub fn wrong_type(
        context: impl Into<String>,
        key: impl Into<String>,
        expected: &'static str,
        found: &Value,
    ) -> Self {
        Self::WrongType {
            context: context.into(),
            key: key.into(),
            expected,
            found: value_kind(found),
        }
    }

    /// A value that must be a map is not one.
    pub fn not_a_map(context: impl Into<String>, found: &Value) -> Self {
        Self::NotAMap {
            context: context.into(),
            found: value_kind(found),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ValidationError
// ─────────────────────────────────────────────────────────────────────────────

/// A present, well-shaped field violates a semantic constraint.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {kind}.{field}: {reason}")]
pub struct ValidationError {
    /// Segment tag or envelope name the field belongs to.
    pub kind: String,
    /// The offending field.
    pub field: String,
    /// Which constraint was violated.
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error.
    pub fn new(
        kind: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DecodeError
// ─────────────────────────────────────────────────────────────────────────────

/// Why a segment, or an event nested inside one, failed to decode.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Structural problem in the payload.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// A field failed validation after construction.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Forward/node nesting went past the configured limit.
    #[error("forward nesting depth {depth} exceeds limit {limit}")]
    DepthExceeded {
        /// Depth at which decoding was cut off.
        depth: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A registered extension decoder rejected its payload.
    #[error("extension decoder for `{tag}` failed: {message}")]
    Extension {
        /// Tag the decoder is registered under.
        tag: String,
        /// The decoder's explanation.
        message: String,
    },
}

impl DecodeError {
    /// Convenience for extension decoders.
    pub fn extension(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extension {
            tag: tag.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExtractionError
// ─────────────────────────────────────────────────────────────────────────────

/// Failure to pull a map-shaped payload out of a raw text line.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The line does not look like an event log line.
    #[error("line does not match the event log pattern")]
    NoMatch,

    /// The map literal has no matching closing brace.
    #[error("map literal is not terminated")]
    Unterminated,

    /// The map literal could not be parsed.
    #[error("map literal syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset into the literal.
        offset: usize,
        /// What the parser expected.
        message: String,
    },

    /// The literal parsed, but not to a map.
    #[error("extracted literal is not a map, found {found}")]
    NotAMap {
        /// Kind of the value actually parsed.
        found: &'static str,
    },

    /// The literal nests deeper than the parser allows.
    #[error("map literal nesting exceeds {limit} levels")]
    TooDeep {
        /// The parser's nesting limit.
        limit: usize,
    },

    /// A text payload reached a dispatcher with no extractor configured.
    #[error("raw text payload received but no line extractor is configured")]
    NoExtractor,
}

// ─────────────────────────────────────────────────────────────────────────────
// ParseError
// ─────────────────────────────────────────────────────────────────────────────

/// Error returned by [`Dispatcher::parse`](crate::Dispatcher::parse).
///
/// Segment-level problems never show up here (they are recovered into
/// [`Unknown`](crate::Unknown) segments); these are failures of the event
/// envelope itself.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The envelope is missing a required element or has the wrong shape.
    #[error("malformed event: {0}")]
    Shape(#[from] ShapeError),

    /// An envelope field failed validation.
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    /// The log-line collaborator could not produce a payload.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

impl From<DecodeError> for ParseError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Shape(e) => Self::Shape(e),
            DecodeError::Validation(e) => Self::Validation(e),
            err @ DecodeError::DepthExceeded { .. } => Self::Shape(ShapeError::Malformed {
                context: "forward segment".to_owned(),
                message: err.to_string(),
            }),
            DecodeError::Extension { tag, message } => Self::Shape(ShapeError::Malformed {
                context: format!("{tag} segment"),
                message,
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RegistryError
// ─────────────────────────────────────────────────────────────────────────────

/// Registration policy violations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The tag already has a decoder; use `replace` to override it.
    #[error("segment tag `{0}` is already registered")]
    Duplicate(String),

    /// The tag belongs to a built-in variant.
    #[error("segment tag `{0}` is reserved for a built-in variant")]
    Reserved(String),

    /// The process-wide registry was already installed (or already read).
    #[error("the global segment registry is already installed")]
    AlreadyInstalled,
}

// ─────────────────────────────────────────────────────────────────────────────
// DecodeReport
// ─────────────────────────────────────────────────────────────────────────────

/// One segment the dispatcher replaced with an unknown-kind placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentFallback {
    /// Forward nesting depth of the event holding the segment (0 = top level).
    pub depth: usize,
    /// Position of the segment in its list.
    pub index: usize,
    /// Wire tag of the segment.
    pub tag: String,
    /// Why the typed decode failed.
    pub error: DecodeError,
}

/// Segment-level failures recovered during one parse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeReport {
    fallbacks: Vec<SegmentFallback>,
}

impl DecodeReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fallback.
    pub fn record(&mut self, fallback: SegmentFallback) {
        self.fallbacks.push(fallback);
    }

    /// Whether every segment decoded into its typed variant.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }

    /// Number of recorded fallbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fallbacks.len()
    }

    /// Whether the report is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fallbacks.is_empty()
    }

    /// Recorded fallbacks in the order they happened.
    #[must_use]
    pub fn fallbacks(&self) -> &[SegmentFallback] {
        &self.fallbacks
    }

    /// Consume the report.
    #[must_use]
    pub fn into_fallbacks(self) -> Vec<SegmentFallback> {
        self.fallbacks
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_kind_names() {
        assert_eq!(value_kind(&json!(null)), "null");
        assert_eq!(value_kind(&json!(1)), "integer");
        assert_eq!(value_kind(&json!(1.5)), "float");
        assert_eq!(value_kind(&json!("x")), "string");
        assert_eq!(value_kind(&json!([])), "array");
        assert_eq!(value_kind(&json!({})), "map");
    }

    #[test]
    fn shape_error_display() {
        let err = ShapeError::missing("at segment", "qq");
        assert_eq!(err.to_string(), "at segment: missing required key `qq`");

        let err = ShapeError::wrong_type("text segment", "text", "a string", &json!(3));
        assert_eq!(
            err.to_string(),
            "text segment: key `text` must be a string, found integer"
        );
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::new("at", "qq", "must be digits or \"all\"");
        assert_eq!(err.to_string(), "invalid at.qq: must be digits or \"all\"");
    }

    #[test]
    fn decode_error_maps_into_parse_error() {
        let err: ParseError = DecodeError::DepthExceeded { depth: 5, limit: 4 }.into();
        assert!(matches!(err, ParseError::Shape(ShapeError::Malformed { .. })));
        assert!(err.to_string().contains("depth 5 exceeds limit 4"));

        let err: ParseError = DecodeError::extension("weather", "no city").into();
        assert!(matches!(err, ParseError::Shape(ShapeError::Malformed { .. })));
        assert!(err.to_string().contains("no city"));
    }

    #[test]
    fn extraction_error_display() {
        let err = ExtractionError::Syntax {
            offset: 7,
            message: "expected `:`".into(),
        };
        assert_eq!(
            err.to_string(),
            "map literal syntax error at offset 7: expected `:`"
        );
        let err: ParseError = ExtractionError::NoExtractor.into();
        assert!(err.to_string().starts_with("extraction failed"));
    }

    #[test]
    fn report_tracks_fallbacks() {
        let mut report = DecodeReport::new();
        assert!(report.is_clean());
        report.record(SegmentFallback {
            depth: 0,
            index: 2,
            tag: "at".into(),
            error: ValidationError::new("at", "qq", "bad").into(),
        });
        assert!(!report.is_clean());
        assert_eq!(report.len(), 1);
        assert_eq!(report.fallbacks()[0].index, 2);
        assert_eq!(report.into_fallbacks().len(), 1);
    }
}
