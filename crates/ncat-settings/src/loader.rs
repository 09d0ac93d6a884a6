//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`NcatSettings::default()`]
//! 2. If `~/.ncat/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `NCAT_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{MAX_FORWARD_DEPTH_LIMIT, NcatSettings};

/// Env var overriding `parser.maxForwardDepth`.
pub const ENV_MAX_FORWARD_DEPTH: &str = "NCAT_MAX_FORWARD_DEPTH";
/// Env var overriding `parser.eventLabel`.
pub const ENV_EVENT_LABEL: &str = "NCAT_EVENT_LABEL";
/// Env var overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "NCAT_LOG_LEVEL";

/// Resolve the path to the settings file (`~/.ncat/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ncat").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<NcatSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or an out-of-range value, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<NcatSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// [`load_settings_from_path`] with an explicit environment lookup.
pub fn load_with_env(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<NcatSettings> {
    let defaults = serde_json::to_value(NcatSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: NcatSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `NCAT_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut NcatSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `env`.
///
/// Empty values are ignored; invalid values are ignored with a warning.
pub fn apply_overrides(settings: &mut NcatSettings, env: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| env(name).filter(|v| !v.is_empty());

    if let Some(val) = read(ENV_MAX_FORWARD_DEPTH) {
        match parse_usize_range(&val, 1, MAX_FORWARD_DEPTH_LIMIT) {
            Some(depth) => settings.parser.max_forward_depth = depth,
            None => warn!(key = ENV_MAX_FORWARD_DEPTH, value = %val, "invalid depth env var, ignoring"),
        }
    }
    if let Some(val) = read(ENV_EVENT_LABEL) {
        settings.parser.event_label = val;
    }
    if let Some(val) = read(ENV_LOG_LEVEL) {
        if is_level_directive(&val) {
            settings.logging.level = val;
        } else {
            warn!(key = ENV_LOG_LEVEL, value = %val, "invalid log level env var, ignoring");
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Whether `val` is a plain level name (`trace` .. `error`, `off`).
pub fn is_level_directive(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
