//! # wabun-settings
//!
//! Configuration for the Wabun memory archive.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`WabunSettings::default()`]
//! 2. **User file**: `~/.wabun/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `WABUN_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use wabun_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("interaction fragments: {}", settings.chunking.interaction_fragment_size);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, wabun_home};
pub use types::*;

use std::sync::OnceLock;

/// Global settings, loaded on first access.
static SETTINGS: OnceLock<WabunSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads `~/.wabun/settings.json` with env var overrides,
/// falling back to compiled defaults if loading fails.
pub fn get_settings() -> &'static WabunSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: WabunSettings) -> std::result::Result<(), WabunSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = WabunSettings::default();
        assert_eq!(settings.name, "wabun");
        assert_eq!(settings.chunking.interaction_fragment_size, 500);
        assert_eq!(settings.chunking.decree_fragment_size, 800);
        assert_eq!(settings.synthesis.decree_k, 2);
        assert_eq!(settings.synthesis.recent_excerpt_chars, 200);
        assert_eq!(settings.synthesis.decision_excerpt_chars, 150);
        assert_eq!(settings.queries.pending_decisions_k, 50);
        assert!(settings.statuses.recognized.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn deep_merge_re_exported() {
        let merged = deep_merge(serde_json::json!({"x": 1}), serde_json::json!({"y": 2}));
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
