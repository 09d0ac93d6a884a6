//! Splitting framework log lines into header and message.
//!
//! Lines look like
//! `[2024-01-01 00:00:00] DEBUG Adapter xyz | 收到事件: {...}`:
//! a bracketed timestamp, an upper-case level, a component name, optional
//! free-form context, then `|` and the message body.

use std::sync::LazyLock;

use regex::Regex;

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^\[(?P<timestamp>[^\]]*)\]\s+(?P<level>[A-Z]+)\s+(?P<component>[^\s|]+)(?P<context>[^|]*)\|\s?(?P<message>.*)$",
    )
    .expect("valid regex")
});

/// Header fields and message body of one log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogLine<'a> {
    /// Text between the leading brackets.
    pub timestamp: &'a str,
    /// Level word, e.g. `DEBUG`.
    pub level: &'a str,
    /// Emitting component.
    pub component: &'a str,
    /// Whatever sits between the component and the `|`, trimmed.
    pub context: &'a str,
    /// Everything after the `|`.
    pub message: &'a str,
}

impl<'a> LogLine<'a> {
    /// Split the message into `label` and body at the first `:`.
    pub fn label_and_body(&self) -> Option<(&'a str, &'a str)> {
        let (label, body) = self.message.split_once(':')?;
        Some((label.trim(), body.trim_start()))
    }
}

/// Split a log line into its header and message, if it has the framework shape.
pub fn split_line(line: &str) -> Option<LogLine<'_>> {
    let caps = LINE_RE.captures(line)?;
    let group = |name: &str| caps.name(name).map_or("", |m| m.as_str());
    Some(LogLine {
        timestamp: group("timestamp"),
        level: group("level"),
        component: group("component"),
        context: group("context").trim(),
        message: group("message"),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_framework_line() {
        let line = "[2024-01-01 00:00:00] DEBUG Adapter xyz | 收到事件: {'type': 'message'}";
        let parsed = split_line(line).unwrap();
        assert_eq!(parsed.timestamp, "2024-01-01 00:00:00");
        assert_eq!(parsed.level, "DEBUG");
        assert_eq!(parsed.component, "Adapter");
        assert_eq!(parsed.context, "xyz");
        assert_eq!(parsed.message, "收到事件: {'type': 'message'}");
        assert_eq!(
            parsed.label_and_body(),
            Some(("收到事件", "{'type': 'message'}"))
        );
    }

    #[test]
    fn context_is_optional() {
        let parsed = split_line("[t] INFO Bot| started").unwrap();
        assert_eq!(parsed.component, "Bot");
        assert_eq!(parsed.context, "");
        assert_eq!(parsed.message, "started");
        assert_eq!(parsed.label_and_body(), None);
    }

    #[test]
    fn message_may_span_lines() {
        let parsed = split_line("[t] DEBUG A | 收到事件: {\n'a': 1\n}").unwrap();
        assert!(parsed.message.ends_with('}'));
    }

    #[test]
    fn rejects_other_shapes() {
        assert_eq!(split_line("plain text"), None);
        assert_eq!(split_line("[t] debug A | lower-case level"), None);
        assert_eq!(split_line("[t] DEBUG A no separator"), None);
    }
}
