//! Map-literal scanning and parsing.
//!
//! Log lines carry event payloads either as JSON or as a single-quoted
//! literal (`{'post_type': 'message', 'self_id': 1, 'anonymous': None}`).
//! [`parse_map_literal`] tries JSON first and falls back to the literal
//! grammar:
//!
//! | form | result |
//! |---|---|
//! | `{k: v, ...}` | map; integer/bool/None keys are stringified |
//! | `[a, b]`, `(a, b)` | array |
//! | `'..'`, `".."` | string, backslash escapes decoded |
//! | `12`, `-3.5e2` | number |
//! | `True` / `False` / `None` | bool / null |
//! | `...` / `Ellipsis` | elision marker |
//!
//! Elision: a sequence stops at the marker and keeps what came before it.
//! A map entry whose value is elided, either a bare marker or a sequence
//! with nothing before the marker, is dropped from its map.

use serde_json::{Map, Number, Value};

use ncat_core::ExtractionError;
use ncat_core::errors::value_kind;

/// Deepest container nesting the literal parser accepts.
pub const MAX_NESTING: usize = 256;

/// Slice the balanced `{...}` literal at the start of `text`.
///
/// Braces inside quoted strings do not count. Leading whitespace is skipped.
pub fn balanced_map_literal(text: &str) -> Result<&str, ExtractionError> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return Err(ExtractionError::NoMatch);
    }

    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, ch) in trimmed.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (_, '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '{') => depth += 1,
            (None, '}') => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&trimmed[..=index]);
                }
            }
            (None, _) => {}
        }
    }
    Err(ExtractionError::Unterminated)
}

/// Parse a map literal, JSON first, then the single-quoted grammar.
pub fn parse_map_literal(text: &str) -> Result<Map<String, Value>, ExtractionError> {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(_) => parse_literal(text)?,
    };
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractionError::NotAMap {
            found: value_kind(&other),
        }),
    }
}

/// Parse any value in the single-quoted literal grammar.
///
/// A top-level elision marker parses to `null`.
pub fn parse_literal(text: &str) -> Result<Value, ExtractionError> {
    let mut parser = Parser::new(text);
    let item = parser.value()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(match item {
        Item::Value(value) => value,
        Item::Elided => Value::Null,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

enum Item {
    Value(Value),
    Elided,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn error(&self, message: impl Into<String>) -> ExtractionError {
        ExtractionError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: char) -> Result<(), ExtractionError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{expected}`")))
        }
    }

    fn enter(&mut self) -> Result<(), ExtractionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExtractionError::TooDeep { limit: MAX_NESTING });
        }
        Ok(())
    }

    fn value(&mut self) -> Result<Item, ExtractionError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.map().map(Item::Value),
            Some('[') => self.sequence('[', ']'),
            Some('(') => self.sequence('(', ')'),
            Some('\'' | '"') => self.string().map(|s| Item::Value(Value::String(s))),
            Some('.') if self.rest().starts_with("...") => {
                self.pos += 3;
                Ok(Item::Elided)
            }
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => {
                self.number().map(Item::Value)
            }
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn map(&mut self) -> Result<Value, ExtractionError> {
        self.enter()?;
        self.consume('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                break;
            }
            let key = match self.value()? {
                Item::Value(key) => Some(map_key(key).ok_or_else(|| self.error("unsupported map key"))?),
                Item::Elided => None,
            };
            self.skip_ws();
            let value = if key.is_some() {
                self.consume(':')?;
                Some(self.value()?)
            } else {
                None
            };
            if let (Some(key), Some(Item::Value(value))) = (key, value) {
                let _ = map.insert(key, value);
            }
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.consume('}')?;
            break;
        }
        self.depth -= 1;
        Ok(Value::Object(map))
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Item, ExtractionError> {
        self.enter()?;
        self.consume(open)?;
        let mut items = Vec::new();
        let mut elided = false;
        loop {
            self.skip_ws();
            if self.eat(close) {
                break;
            }
            match self.value()? {
                Item::Value(value) if !elided => items.push(value),
                Item::Value(_) => {}
                Item::Elided => elided = true,
            }
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.consume(close)?;
            break;
        }
        self.depth -= 1;
        if elided && items.is_empty() {
            Ok(Item::Elided)
        } else {
            Ok(Item::Value(Value::Array(items)))
        }
    }

    fn string(&mut self) -> Result<String, ExtractionError> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Err(self.error("expected a string"));
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), ExtractionError> {
        let Some(ch) = self.bump() else {
            return Err(self.error("unterminated escape"));
        };
        match ch {
            '\\' | '\'' | '"' => out.push(ch),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '\n' => {}
            'x' => out.push(self.hex_escape(2)?),
            'u' => out.push(self.hex_escape(4)?),
            'U' => out.push(self.hex_escape(8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, ExtractionError> {
        let hex = self
            .rest()
            .get(..digits)
            .filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| self.error("invalid hex escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        let ch = char::from_u32(code).ok_or_else(|| self.error("escape is not a character"))?;
        self.pos += digits;
        Ok(ch)
    }

    fn number(&mut self) -> Result<Value, ExtractionError> {
        let start = self.pos;
        let text = self.rest();
        let len = text
            .char_indices()
            .find(|&(i, c)| {
                !(c.is_ascii_digit()
                    || matches!(c, '.' | 'e' | 'E' | '_')
                    || (matches!(c, '-' | '+')
                        && (i == 0 || text[..i].ends_with(['e', 'E']))))
            })
            .map_or(text.len(), |(i, _)| i);
        let raw: String = text[..len].chars().filter(|&c| c != '_').collect();
        self.pos += len;

        let number = if raw.contains(['.', 'e', 'E']) {
            raw.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            let digits = raw.strip_prefix('+').unwrap_or(&raw);
            digits
                .parse::<i64>()
                .map(Number::from)
                .or_else(|_| digits.parse::<u64>().map(Number::from))
                .ok()
                .or_else(|| digits.parse::<f64>().ok().and_then(Number::from_f64))
        };
        number.map(Value::Number).ok_or_else(|| {
            self.pos = start;
            self.error(format!("invalid number `{raw}`"))
        })
    }

    fn keyword(&mut self) -> Result<Item, ExtractionError> {
        let start = self.pos;
        let word_len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len());
        let word = &self.rest()[..word_len];
        self.pos += word_len;
        match word {
            "True" | "true" => Ok(Item::Value(Value::Bool(true))),
            "False" | "false" => Ok(Item::Value(Value::Bool(false))),
            "None" | "null" => Ok(Item::Value(Value::Null)),
            "Ellipsis" => Ok(Item::Elided),
            other => {
                let message = format!("unknown name `{other}`");
                self.pos = start;
                Err(self.error(message))
            }
        }
    }
}

/// Stringify a literal map key.
fn map_key(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if b { "True" } else { "False" }.to_owned()),
        Value::Null => Some("None".to_owned()),
        Value::Array(_) | Value::Object(_) => None,
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

    fn parse(text: &str) -> Value {
        Value::Object(parse_map_literal(text).unwrap())
    }

    #[test]
    fn balanced_ignores_braces_in_strings() {
        let text = "{'type': 'text', 'pattern': '{hello}'} more text";
        assert_eq!(
            balanced_map_literal(text).unwrap(),
            "{'type': 'text', 'pattern': '{hello}'}"
        );
    }

    #[test]
    fn balanced_tracks_the_opening_quote() {
        let text = r#"{'a': "it's {", 'b': 1} tail"#;
        assert_eq!(balanced_map_literal(text).unwrap(), r#"{'a': "it's {", 'b': 1}"#);
    }

    #[test]
    fn balanced_multiline_and_nested() {
        let text = "{'outer': {'inner': {\n  'deep': 'value'\n}}}\n[next line]";
        let literal = balanced_map_literal(text).unwrap();
        assert!(literal.ends_with("}}}"));
        assert_eq!(literal.matches('{').count(), 3);
    }

    #[test]
    fn balanced_errors() {
        assert_eq!(balanced_map_literal("no brace"), Err(ExtractionError::NoMatch));
        assert_eq!(balanced_map_literal("{'a': {1}"), Err(ExtractionError::Unterminated));
    }

    #[test]
    fn json_is_parsed_first() {
        assert_eq!(parse(r#"{"type": "text", "data": "hello"}"#), json!({"type": "text", "data": "hello"}));
    }

    #[test]
    fn single_quoted_literal() {
        assert_eq!(
            parse("{'user': {'id': 123, 'name': 'test'}, 'items': [1, 2, 3], 'k': None, 'ok': True}"),
            json!({"user": {"id": 123, "name": "test"}, "items": [1, 2, 3], "k": null, "ok": true})
        );
    }

    #[test]
    fn mixed_quotes_and_escapes() {
        assert_eq!(
            parse(r#"{'type': "text", 'msg': 'He said \"hi\"\n', 'apos': "it's", 'u': '你\x41'}"#),
            json!({"type": "text", "msg": "He said \"hi\"\n", "apos": "it's", "u": "你A"})
        );
    }

    #[test]
    fn numbers_tuples_and_trailing_commas() {
        assert_eq!(
            parse("{'a': -7, 'b': 2.5, 'c': 1e3, 'd': (1, 'x',), 'e': 18446744073709551615, 1: 'int key',}"),
            json!({"a": -7, "b": 2.5, "c": 1000.0, "d": [1, "x"], "e": 18_446_744_073_709_551_615_u64, "1": "int key"})
        );
    }

    #[test]
    fn elided_list_value_is_omitted() {
        assert_eq!(
            parse("{'message': [{'type': 'forward', 'data': {'id': '1', 'content': [...]}}], 'time': 1}"),
            json!({"message": [{"type": "forward", "data": {"id": "1"}}], "time": 1})
        );
    }

    #[test]
    fn elided_tail_keeps_prefix() {
        assert_eq!(
            parse("{'items': [1, 2, ...], 'rest': ..., 'after': Ellipsis, 'last': 'x'}"),
            json!({"items": [1, 2], "last": "x"})
        );
    }

    #[test]
    fn errors_carry_offsets() {
        assert_matches!(
            parse_map_literal("{'a' 1}"),
            Err(ExtractionError::Syntax { offset: 5, .. })
        );
        assert_matches!(
            parse_map_literal("{'a': nope}"),
            Err(ExtractionError::Syntax { message, .. }) if message.contains("nope")
        );
        assert_matches!(
            parse_map_literal("{'a': 'open"),
            Err(ExtractionError::Syntax { message, .. }) if message.contains("unterminated")
        );
        assert_matches!(parse_map_literal("this is not a dict"), Err(ExtractionError::Syntax { .. }));
    }

    #[test]
    fn non_map_literal_is_rejected() {
        assert_eq!(parse_map_literal("[1, 2]"), Err(ExtractionError::NotAMap { found: "array" }));
        assert_eq!(parse_map_literal("'x'"), Err(ExtractionError::NotAMap { found: "string" }));
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}{}", "[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1));
        assert_eq!(
            parse_literal(&deep),
            Err(ExtractionError::TooDeep { limit: MAX_NESTING })
        );
        let ok = format!("{}{}", "[".repeat(MAX_NESTING), "]".repeat(MAX_NESTING));
        assert!(parse_literal(&ok).is_ok());
    }
}
