//! Pulling event payloads out of log text.

use serde_json::{Map, Value};
use tracing::trace;

use ncat_core::{ExtractionError, LineExtractor};

use crate::line::split_line;
use crate::literal::{balanced_map_literal, parse_map_literal};

/// Label the framework logs in front of every received event.
pub const DEFAULT_EVENT_LABEL: &str = "收到事件";

/// Extracts the `<label>: {...}` payload from a log line.
///
/// Plugs into [`ncat_core::Dispatcher::with_extractor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLineExtractor {
    label: String,
}

impl Default for LogLineExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LABEL)
    }
}

impl LogLineExtractor {
    /// Create an extractor looking for `label`. An empty label matches
    /// nothing.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// The label this extractor looks for.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Byte offset of the `{` following the first `<label>:` at or after
    /// `from`, and the offset just past the label.
    fn find_payload(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        if self.label.is_empty() {
            return None;
        }
        let mut cursor = from;
        while let Some(found) = text[cursor..].find(self.label.as_str()) {
            let after_label = cursor + found + self.label.len();
            let rest = &text[after_label..];
            if let Some(body) = rest.strip_prefix(':') {
                let trimmed = body.trim_start();
                if trimmed.starts_with('{') {
                    let brace = text.len() - trimmed.len();
                    return Some((brace, after_label));
                }
            }
            cursor = after_label;
        }
        None
    }

    /// Iterate every `<label>: {...}` payload in multi-line log text.
    ///
    /// A payload that fails to parse is yielded as an error and scanning
    /// resumes after its label.
    pub fn scan_events<'a>(&'a self, text: &'a str) -> ScanEvents<'a> {
        ScanEvents {
            extractor: self,
            text,
            cursor: 0,
        }
    }
}

impl LineExtractor for LogLineExtractor {
    fn extract(&self, line: &str) -> Result<Map<String, Value>, ExtractionError> {
        if let Some(header) = split_line(line) {
            trace!(
                timestamp = header.timestamp,
                level = header.level,
                component = header.component,
                "extracting event payload"
            );
        }
        let (brace, _) = self
            .find_payload(line, 0)
            .ok_or(ExtractionError::NoMatch)?;
        let literal = balanced_map_literal(&line[brace..])?;
        parse_map_literal(literal)
    }
}

/// One payload found by [`LogLineExtractor::scan_events`].
#[derive(Clone, Debug, PartialEq)]
pub struct ScannedEvent {
    /// 1-based line number of the label.
    pub line: usize,
    /// The parsed payload, or why it could not be parsed.
    pub result: Result<Map<String, Value>, ExtractionError>,
}

/// Iterator returned by [`LogLineExtractor::scan_events`].
#[derive(Debug)]
pub struct ScanEvents<'a> {
    extractor: &'a LogLineExtractor,
    text: &'a str,
    cursor: usize,
}

impl Iterator for ScanEvents<'_> {
    type Item = ScannedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let (brace, after_label) = self.extractor.find_payload(self.text, self.cursor)?;
        let line = self.text[..brace].matches('\n').count() + 1;
        let result = match balanced_map_literal(&self.text[brace..]) {
            Ok(literal) => {
                self.cursor = brace + literal.len();
                parse_map_literal(literal)
            }
            Err(err) => {
                self.cursor = after_label;
                Err(err)
            }
        };
        Some(ScannedEvent { line, result })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn extracts_single_quoted_payload() {
        let line = "[2024-01-01 00:00:00] DEBUG Adapter xyz | 收到事件: {'type': 'text', 'n': None}";
        let map = LogLineExtractor::default().extract(line).unwrap();
        assert_eq!(Value::Object(map), json!({"type": "text", "n": null}));
    }

    #[test]
    fn braces_inside_strings_and_trailing_text() {
        let line = "prefix 收到事件: {'pattern': '{hello}', 'x': \"}\"} suffix {not this}";
        let map = LogLineExtractor::default().extract(line).unwrap();
        assert_eq!(Value::Object(map), json!({"pattern": "{hello}", "x": "}"}));
    }

    #[test]
    fn missing_label_is_no_match() {
        let extractor = LogLineExtractor::default();
        assert_eq!(extractor.extract("DEBUG nothing here"), Err(ExtractionError::NoMatch));
        assert_eq!(extractor.extract("收到事件 {'a': 1}"), Err(ExtractionError::NoMatch));
        assert_eq!(extractor.extract("收到事件: not a map"), Err(ExtractionError::NoMatch));
    }

    #[test]
    fn label_is_configurable() {
        let extractor = LogLineExtractor::new("event");
        assert_eq!(extractor.label(), "event");
        let map = extractor.extract("event:{\"a\": 1}").unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));
    }

    #[test]
    fn empty_label_matches_nothing() {
        let extractor = LogLineExtractor::new("");
        assert_eq!(extractor.extract("x: {'a': 1}"), Err(ExtractionError::NoMatch));
        assert_eq!(extractor.scan_events("{'a': 1}\n: {'b': 2}").count(), 0);
    }

    #[test]
    fn skips_label_without_payload() {
        let line = "收到事件: pending; 收到事件: {'a': 2}";
        let map = LogLineExtractor::default().extract(line).unwrap();
        assert_eq!(map.get("a"), Some(&json!(2)));
    }

    #[test]
    fn unterminated_payload() {
        assert_eq!(
            LogLineExtractor::default().extract("收到事件: {'a': {1: 2}"),
            Err(ExtractionError::Unterminated)
        );
    }

    #[test]
    fn scan_reports_line_numbers() {
        let text = "[t] INFO Bot | started\n\
                    [t] DEBUG Adapter | 收到事件: {'a': 1}\n\
                    [t] DEBUG Adapter | 收到事件: {'b':\n  [2, ...]}\n\
                    [t] DEBUG Adapter | 收到事件: {'c': oops}\n\
                    [t] DEBUG Adapter | 收到事件: {'d': 4}\n";
        let extractor = LogLineExtractor::default();
        let scanned: Vec<_> = extractor.scan_events(text).collect();
        assert_eq!(scanned.len(), 4);
        assert_eq!(scanned[0].line, 2);
        assert_eq!(Value::Object(scanned[0].result.clone().unwrap()), json!({"a": 1}));
        assert_eq!(scanned[1].line, 3);
        assert_eq!(Value::Object(scanned[1].result.clone().unwrap()), json!({"b": [2]}));
        assert_eq!(scanned[2].line, 5);
        assert_matches!(scanned[2].result, Err(ExtractionError::Syntax { .. }));
        assert_eq!(scanned[3].line, 6);
    }

    #[test]
    fn scan_resumes_after_unterminated_payload() {
        let text = "收到事件: {'a': '\n收到事件: {'b': 1}";
        let scanned: Vec<_> = LogLineExtractor::default().scan_events(text).collect();
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].result, Err(ExtractionError::Unterminated));
        assert_eq!((scanned[1].line, scanned[1].result.clone().unwrap().len()), (2, 1));
    }
}
