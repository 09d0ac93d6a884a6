//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a settings file only needs the keys it overrides.

use ncat_core::logging::LogFormat;
use ncat_core::{DEFAULT_MAX_FORWARD_DEPTH, ParseOptions};
use ncat_logline::DEFAULT_EVENT_LABEL;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Upper bound accepted for [`ParserSettings::max_forward_depth`].
pub const MAX_FORWARD_DEPTH_LIMIT: usize = 256;

/// Root settings type.
///
/// ```json
/// {
///   "version": "0.1.0",
///   "parser": { "maxForwardDepth": 8 },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NcatSettings {
    /// Settings schema version.
    pub version: String,
    /// Dispatcher and extractor knobs.
    pub parser: ParserSettings,
    /// Log output configuration.
    pub logging: LoggingSettings,
}

impl Default for NcatSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            parser: ParserSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl NcatSettings {
    /// Reject values the parser cannot run with.
    pub fn validate(&self) -> Result<()> {
        let depth = self.parser.max_forward_depth;
        if depth == 0 || depth > MAX_FORWARD_DEPTH_LIMIT {
            return Err(SettingsError::InvalidValue(format!(
                "parser.maxForwardDepth must be within 1..={MAX_FORWARD_DEPTH_LIMIT}, got {depth}"
            )));
        }
        if self.parser.event_label.is_empty() {
            return Err(SettingsError::InvalidValue(
                "parser.eventLabel must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Dispatcher and log-line extractor settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserSettings {
    /// Deepest forward nesting accepted before a parse is aborted.
    pub max_forward_depth: usize,
    /// Label preceding event payloads in log lines.
    pub event_label: String,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            max_forward_depth: DEFAULT_MAX_FORWARD_DEPTH,
            event_label: DEFAULT_EVENT_LABEL.to_string(),
        }
    }
}

impl ParserSettings {
    /// Dispatcher options built from these settings.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::default().with_max_forward_depth(self.max_forward_depth)
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Parsed output format; unknown names fall back to compact.
    pub fn log_format(&self) -> LogFormat {
        self.format.parse().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
