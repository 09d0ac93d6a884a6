//! # ncat-settings
//!
//! Layered configuration for the ncat event parser.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`NcatSettings::default()`]
//! 2. **User file**: `~/.ncat/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `NCAT_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, load_with_env,
    settings_path,
};
pub use types::*;

use std::sync::OnceLock;

use tracing::warn;

/// Global settings singleton, initialized on first access.
static SETTINGS: OnceLock<NcatSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.ncat/settings.json` with env var
/// overrides. If loading fails, logs a warning and uses compiled defaults.
pub fn get_settings() -> &'static NcatSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load settings, using defaults");
            NcatSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: NcatSettings) -> std::result::Result<(), NcatSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
