//! Parser and dispatcher: turns raw payloads into typed event trees.
//!
//! A payload is either an already-parsed JSON value or a raw log line. Lines
//! go through the configured [`LineExtractor`] first. The resulting map is
//! routed by its discriminator, then every segment is decoded:
//!
//! 1. built-in tag → the matching variant decoder
//! 2. registered tag → the [`SegmentRegistry`] decoder
//! 3. anything else → [`Segment::Unknown`]
//!
//! A segment whose typed decode fails is kept as [`Segment::Unknown`], logged
//! at WARN and recorded in the [`DecodeReport`]. A forward or node nested past
//! the depth limit is one such failure: the segment that would have crossed
//! the limit is kept raw and the rest of the event survives.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::errors::{
    DecodeError, DecodeReport, ExtractionError, ParseError, SegmentFallback, ShapeError,
};
use crate::event::Event;
use crate::registry::{SegmentDecoder, SegmentRegistry, global_registry};
use crate::segments::{Extension, Segment, decode_builtin, is_builtin_tag};

/// Default forward nesting limit.
pub const DEFAULT_MAX_FORWARD_DEPTH: usize = 32;

/// Knobs for one dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest forward/node nesting accepted. A top-level event is depth 0;
    /// each forward or node segment adds one level.
    pub max_forward_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_forward_depth: DEFAULT_MAX_FORWARD_DEPTH,
        }
    }
}

impl ParseOptions {
    /// Override the nesting limit.
    #[must_use]
    pub fn with_max_forward_depth(mut self, depth: usize) -> Self {
        self.max_forward_depth = depth;
        self
    }
}

/// Pulls a map-shaped payload out of a raw text line.
pub trait LineExtractor: fmt::Debug + Send + Sync {
    /// Extract the event map from one line.
    fn extract(&self, line: &str) -> Result<Map<String, Value>, ExtractionError>;
}

/// Input accepted by [`Dispatcher::parse`].
#[derive(Clone, Debug, PartialEq)]
pub enum RawPayload {
    /// Already-parsed JSON.
    Value(Value),
    /// A raw log line for the [`LineExtractor`].
    Line(String),
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Map<String, Value>> for RawPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self::Value(Value::Object(map))
    }
}

impl From<String> for RawPayload {
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

impl From<&str> for RawPayload {
    fn from(line: &str) -> Self {
        Self::Line(line.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DecodeContext
// ─────────────────────────────────────────────────────────────────────────────

/// State threaded through one parse: registry, limits, current nesting depth
/// and the fallback report.
pub struct DecodeContext<'a> {
    registry: &'a SegmentRegistry,
    options: &'a ParseOptions,
    depth: usize,
    report: &'a mut DecodeReport,
}

impl<'a> DecodeContext<'a> {
    pub(crate) fn new(
        registry: &'a SegmentRegistry,
        options: &'a ParseOptions,
        report: &'a mut DecodeReport,
    ) -> Self {
        Self {
            registry,
            options,
            depth: 0,
            report,
        }
    }

    /// Current forward nesting depth (0 = top-level event).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Options in effect.
    pub fn options(&self) -> &ParseOptions {
        self.options
    }

    /// Run `f` one nesting level down, failing if that passes the limit.
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let depth = self.depth + 1;
        let limit = self.options.max_forward_depth;
        if depth > limit {
            return Err(DecodeError::DepthExceeded { depth, limit });
        }
        self.depth = depth;
        let result = f(self);
        self.depth = depth - 1;
        result
    }

    /// Decode a `message` array.
    ///
    /// An entry that is not a map with a string `type` fails the whole list.
    /// Typed decode failures, depth overflow included, become
    /// [`Segment::Unknown`].
    pub(crate) fn decode_segments(&mut self, items: &[Value]) -> Result<Vec<Segment>, DecodeError> {
        let mut segments = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let Value::Object(raw) = item else {
                return Err(ShapeError::not_a_map(format!("segment {index}"), item).into());
            };
            let tag = match raw.get("type") {
                Some(Value::String(tag)) => tag.as_str(),
                Some(other) => {
                    return Err(ShapeError::wrong_type(
                        format!("segment {index}"),
                        "type",
                        "a string",
                        other,
                    )
                    .into());
                }
                None => return Err(ShapeError::missing(format!("segment {index}"), "type").into()),
            };
            trace!(tag, index, depth = self.depth, "decoding segment");
            match self.decode_tagged(tag, raw) {
                Ok(segment) => segments.push(segment),
                Err(error) => {
                    warn!(
                        tag,
                        index,
                        depth = self.depth,
                        error = %error,
                        "segment decode failed, keeping it as unknown"
                    );
                    self.report.record(SegmentFallback {
                        depth: self.depth,
                        index,
                        tag: tag.to_owned(),
                        error,
                    });
                    segments.push(Segment::unknown(raw.clone()));
                }
            }
        }
        Ok(segments)
    }

    fn decode_tagged(
        &mut self,
        tag: &str,
        raw: &Map<String, Value>,
    ) -> Result<Segment, DecodeError> {
        let registry = self.registry;
        let decoder = registry.get(tag);
        if !is_builtin_tag(tag) && decoder.is_none() {
            return Ok(Segment::unknown(raw.clone()));
        }
        let data = match raw.get("data") {
            Some(Value::Object(data)) => data,
            Some(other) => {
                return Err(ShapeError::not_a_map(format!("{tag} segment data"), other).into());
            }
            None => return Err(ShapeError::missing(format!("{tag} segment"), "data").into()),
        };
        if let Some(decoded) = decode_builtin(tag, data, self) {
            return decoded;
        }
        match decoder {
            Some(decoder) => decode_extension(tag, decoder, data),
            None => Ok(Segment::unknown(raw.clone())),
        }
    }
}

fn decode_extension(
    tag: &str,
    decoder: &SegmentDecoder,
    data: &Map<String, Value>,
) -> Result<Segment, DecodeError> {
    let segment = decoder(data)?;
    if segment.kind() != tag {
        return Err(DecodeError::extension(
            tag,
            format!("decoder produced a `{}` segment", segment.kind()),
        ));
    }
    segment.validate()?;
    Ok(Segment::Extension(Extension::new(segment)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Parses raw payloads into [`Event`] trees.
///
/// Cheap to clone; the registry and extractor are shared.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<SegmentRegistry>,
    options: ParseOptions,
    extractor: Option<Arc<dyn LineExtractor>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(global_registry())
    }
}

impl Dispatcher {
    /// A dispatcher over the given registry with default options and no
    /// line extractor.
    pub fn new(registry: Arc<SegmentRegistry>) -> Self {
        Self {
            registry,
            options: ParseOptions::default(),
            extractor: None,
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Accept raw log lines through `extractor`.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn LineExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// The process-wide dispatcher over [`global_registry`]. Has no line
    /// extractor.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<Dispatcher> = OnceLock::new();
        GLOBAL.get_or_init(Self::default)
    }

    /// Options in effect.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The segment registry.
    pub fn registry(&self) -> &SegmentRegistry {
        &self.registry
    }

    /// Parse a payload into an event.
    pub fn parse(&self, raw: impl Into<RawPayload>) -> Result<Event, ParseError> {
        self.parse_with_report(raw).map(|(event, _)| event)
    }

    /// Parse a payload and also return the segment fallbacks taken.
    pub fn parse_with_report(
        &self,
        raw: impl Into<RawPayload>,
    ) -> Result<(Event, DecodeReport), ParseError> {
        let map = match raw.into() {
            RawPayload::Value(Value::Object(map)) => map,
            RawPayload::Value(other) => return Err(ShapeError::not_a_map("event", &other).into()),
            RawPayload::Line(line) => {
                let extractor = self.extractor.as_ref().ok_or(ExtractionError::NoExtractor)?;
                extractor.extract(&line).inspect_err(|error| {
                    debug!(error = %error, "line extraction failed");
                })?
            }
        };
        self.decode_event(&map)
    }

    /// Decode an event map.
    pub fn decode_event(
        &self,
        map: &Map<String, Value>,
    ) -> Result<(Event, DecodeReport), ParseError> {
        let mut report = DecodeReport::new();
        let mut cx = DecodeContext::new(&self.registry, &self.options, &mut report);
        let event = Event::decode(map, &mut cx).map_err(|error| {
            warn!(error = %error, "event rejected");
            ParseError::from(error)
        })?;
        debug!(
            kind = event.kind(),
            fallbacks = report.len(),
            "event decoded"
        );
        Ok((event, report))
    }

    /// Decode one segment map at top level. Typed decode failures yield
    /// [`Segment::Unknown`] like they do inside a message.
    pub fn decode_segment(&self, segment: &Value) -> Result<Segment, ParseError> {
        let mut report = DecodeReport::new();
        let mut cx = DecodeContext::new(&self.registry, &self.options, &mut report);
        let mut segments = cx.decode_segments(std::slice::from_ref(segment))?;
        segments.pop().ok_or_else(|| {
            ShapeError::Malformed {
                context: "segment".into(),
                message: "decoder produced no segment".into(),
            }
            .into()
        })
    }
}

/// Parse with the process-wide dispatcher.
pub fn parse(raw: impl Into<RawPayload>) -> Result<Event, ParseError> {
    Dispatcher::global().parse(raw)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use crate::logging::test_utils::capture_logs;
    use crate::segments::MessageSegment;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn message(segments: Value) -> Value {
        json!({
            "post_type": "message",
            "message_type": "private",
            "time": 1_700_000_000,
            "message_id": 1,
            "sender": {"user_id": 10001},
            "message": segments
        })
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(SegmentRegistry::new()))
    }

    #[test]
    fn parses_plain_message() {
        let event = dispatcher()
            .parse(message(json!([{"type": "text", "data": {"text": "hi"}}])))
            .unwrap();
        let msg = event.as_message().unwrap();
        assert_eq!(msg.segments, vec![Segment::text("hi")]);
    }

    #[test]
    fn unknown_tag_is_kept_without_fallback() {
        let raw = json!({"type": "weather", "data": {"city": "x"}, "v": 2});
        let (event, report) = dispatcher()
            .parse_with_report(message(json!([raw.clone()])))
            .unwrap();
        assert!(report.is_clean());
        let msg = event.as_message().unwrap();
        assert!(msg.segments[0].is_unknown());
        assert_eq!(msg.segments[0].encode(), raw);
    }

    #[test]
    fn invalid_builtin_falls_back_and_is_reported() {
        let (logs, _guard) = capture_logs();
        let bad = json!({"type": "at", "data": {"qq": "abc"}});
        let input = message(json!([{"type": "text", "data": {"text": "x"}}, bad.clone()]));
        let (event, report) = dispatcher().parse_with_report(input.clone()).unwrap();

        let msg = event.as_message().unwrap();
        assert!(msg.segments[1].is_unknown());
        assert_eq!(event.encode(), input);

        assert_eq!(report.len(), 1);
        let fallback = &report.fallbacks()[0];
        assert_eq!((fallback.depth, fallback.index), (0, 1));
        assert_eq!(fallback.tag, "at");
        assert_matches!(fallback.error, DecodeError::Validation(_));

        assert!(logs.has_event(tracing::Level::WARN, "segment decode failed"));
    }

    #[test]
    fn builtin_with_non_map_data_falls_back() {
        let (event, report) = dispatcher()
            .parse_with_report(message(json!([{"type": "text", "data": "hi"}])))
            .unwrap();
        assert!(event.as_message().unwrap().segments[0].is_unknown());
        assert_matches!(
            report.fallbacks()[0].error,
            DecodeError::Shape(ShapeError::NotAMap { .. })
        );
    }

    #[test]
    fn segment_without_type_fails_event() {
        let (logs, _guard) = capture_logs();
        assert_matches!(
            dispatcher().parse(message(json!([{"data": {"text": "hi"}}]))),
            Err(ParseError::Shape(ShapeError::MissingKey { key, .. })) if key == "type"
        );
        assert_matches!(
            dispatcher().parse(message(json!(["hi"]))),
            Err(ParseError::Shape(ShapeError::NotAMap { .. }))
        );
        assert!(logs.has_message("event rejected"));
        let rejected: Vec<_> = logs
            .events()
            .into_iter()
            .filter(|event| event.level == tracing::Level::WARN)
            .collect();
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn non_map_payload_is_shape_error() {
        assert_matches!(
            dispatcher().parse(json!([1, 2])),
            Err(ParseError::Shape(ShapeError::NotAMap { found: "array", .. }))
        );
    }

    #[test]
    fn line_without_extractor_fails() {
        assert_matches!(
            dispatcher().parse("收到事件: {}"),
            Err(ParseError::Extraction(ExtractionError::NoExtractor))
        );
    }

    #[derive(Debug)]
    struct FixedExtractor(Value);

    impl LineExtractor for FixedExtractor {
        fn extract(&self, _line: &str) -> Result<Map<String, Value>, ExtractionError> {
            match &self.0 {
                Value::Object(map) => Ok(map.clone()),
                other => Err(ExtractionError::NotAMap {
                    found: crate::errors::value_kind(other),
                }),
            }
        }
    }

    #[test]
    fn line_goes_through_extractor() {
        let payload = message(json!([{"type": "face", "data": {"id": 1}}]));
        let dispatcher = dispatcher().with_extractor(Arc::new(FixedExtractor(payload)));
        let event = dispatcher.parse("anything").unwrap();
        assert_eq!(event.as_message().unwrap().segments, vec![Segment::face(1)]);

        let failing = self::dispatcher().with_extractor(Arc::new(FixedExtractor(json!(3))));
        assert_matches!(
            failing.parse("anything"),
            Err(ParseError::Extraction(ExtractionError::NotAMap { found: "integer" }))
        );
    }

    fn nested_forward(levels: usize) -> Value {
        let mut inner = json!([{"type": "text", "data": {"text": "bottom"}}]);
        for _ in 0..levels {
            inner = json!([{"type": "forward", "data": {"id": "f", "content": [message(inner)]}}]);
        }
        message(inner)
    }

    #[test]
    fn forward_within_limit_parses() {
        let input = nested_forward(3);
        let dispatcher = dispatcher().with_options(ParseOptions::default().with_max_forward_depth(3));
        let (event, report) = dispatcher.parse_with_report(input.clone()).unwrap();
        assert!(report.is_clean());
        assert_eq!(event.encode(), input);
    }

    #[test]
    fn forward_past_limit_falls_back_and_keeps_siblings() {
        let (logs, _guard) = capture_logs();
        let too_deep = nested_forward(4)["message"][0].clone();
        let input = message(json!([{"type": "text", "data": {"text": "keep me"}}, too_deep]));
        let dispatcher = dispatcher().with_options(ParseOptions::default().with_max_forward_depth(3));

        let (event, report) = dispatcher.parse_with_report(input.clone()).unwrap();
        let msg = event.as_message().unwrap();
        assert_eq!(msg.segments[0], Segment::text("keep me"));
        assert_matches!(msg.segments[1], Segment::Forward(_));
        assert_eq!(event.encode(), input);

        assert_eq!(report.len(), 1);
        let fallback = &report.fallbacks()[0];
        assert_eq!((fallback.depth, fallback.index, fallback.tag.as_str()), (3, 0, "forward"));
        assert_eq!(fallback.error, DecodeError::DepthExceeded { depth: 4, limit: 3 });

        let warnings: Vec<_> = logs
            .events_for_target("ncat_core::dispatch")
            .into_iter()
            .filter(|e| e.level == tracing::Level::WARN)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field("tag"), Some("forward"));
        assert_eq!(logs.count_at_level(tracing::Level::WARN), 1);
    }

    #[derive(Debug)]
    struct Weather {
        city: String,
    }

    impl MessageSegment for Weather {
        fn kind(&self) -> &str {
            "weather"
        }

        fn encode_data(&self) -> Map<String, Value> {
            let mut map = Map::new();
            let _ = map.insert("city".into(), Value::String(self.city.clone()));
            map
        }

        fn validate(&self) -> Result<(), ValidationError> {
            if self.city.is_empty() {
                return Err(ValidationError::new("weather", "city", "must not be empty"));
            }
            Ok(())
        }
    }

    fn weather_registry() -> Arc<SegmentRegistry> {
        let mut registry = SegmentRegistry::new();
        registry
            .register("weather", |data: &Map<String, Value>| {
                let city = data
                    .get("city")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DecodeError::extension("weather", "missing city"))?;
                Ok(Arc::new(Weather { city: city.to_owned() }) as Arc<dyn MessageSegment>)
            })
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn registered_tag_decodes_to_extension() {
        let dispatcher = Dispatcher::new(weather_registry());
        let segment = json!({"type": "weather", "data": {"city": "x"}});
        let decoded = dispatcher.decode_segment(&segment).unwrap();
        assert_matches!(decoded, Segment::Extension(_));
        assert_eq!(decoded.encode(), segment);
    }

    #[test]
    fn failing_extension_falls_back() {
        let dispatcher = Dispatcher::new(weather_registry());
        let (event, report) = dispatcher
            .parse_with_report(message(json!([
                {"type": "weather", "data": {}},
                {"type": "weather", "data": {"city": ""}}
            ])))
            .unwrap();
        let segments = &event.as_message().unwrap().segments;
        assert!(segments.iter().all(Segment::is_unknown));
        assert_matches!(report.fallbacks()[0].error, DecodeError::Extension { .. });
        assert_matches!(report.fallbacks()[1].error, DecodeError::Validation(_));
    }

    #[test]
    fn decode_segment_falls_back_to_unknown() {
        let segment = json!({"type": "reply", "data": {"id": ""}});
        let decoded = dispatcher().decode_segment(&segment).unwrap();
        assert!(decoded.is_unknown());
        assert_eq!(decoded.encode(), segment);
    }
}
