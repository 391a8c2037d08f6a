//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`WabunSettings::default()`]
//! 2. If `~/.wabun/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `WABUN_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::WabunSettings;

/// The archive's home directory (`~/.wabun`).
pub fn wabun_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".wabun")
}

/// Resolve the path to the settings file (`~/.wabun/settings.json`).
pub fn settings_path() -> PathBuf {
    wabun_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WabunSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<WabunSettings> {
    let defaults = serde_json::to_value(WabunSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: WabunSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
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

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning and the file/default value
/// stays in place.
pub fn apply_env_overrides(settings: &mut WabunSettings) {
    // ── Storage ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("WABUN_DB_PATH") {
        settings.storage.db_path = v;
    }
    if let Some(v) = read_env_u32("WABUN_POOL_SIZE", 1, 64) {
        settings.storage.pool_size = v;
    }
    if let Some(v) = read_env_u64("WABUN_BUSY_TIMEOUT_MS", 0, 600_000) {
        settings.storage.busy_timeout_ms = v;
    }

    // ── Chunking ────────────────────────────────────────────────────
    if let Some(v) = read_env_usize("WABUN_INTERACTION_FRAGMENT_SIZE", 1, 1_000_000) {
        settings.chunking.interaction_fragment_size = v;
    }
    if let Some(v) = read_env_usize("WABUN_DECREE_FRAGMENT_SIZE", 1, 1_000_000) {
        settings.chunking.decree_fragment_size = v;
    }

    // ── Embedding ───────────────────────────────────────────────────
    if let Some(v) = read_env_usize("WABUN_EMBEDDING_DIMENSIONS", 1, 8192) {
        settings.embedding.dimensions = v;
    }

    // ── Statuses / logging ──────────────────────────────────────────
    if let Some(v) = read_env_string("WABUN_RECOGNIZED_STATUSES") {
        settings.statuses.recognized = parse_list(&v);
    }
    if let Some(v) = read_env_string("WABUN_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a comma-separated list, dropping blank entries.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"chunking": {"a": 500, "b": 800}});
        let source = serde_json::json!({"chunking": {"b": 1200}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["chunking"]["a"], 500);
        assert_eq!(merged["chunking"]["b"], 1200);
    }

    #[test]
    fn merge_array_replaced() {
        let target = serde_json::json!({"list": ["a", "b"]});
        let source = serde_json::json!({"list": ["c"]});
        assert_eq!(deep_merge(target, source)["list"], serde_json::json!(["c"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"a": null});
        assert_eq!(deep_merge(target, source)["a"], 1);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.chunking.interaction_fragment_size, 500);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"chunking": {"decreeFragmentSize": 1200}, "statuses": {"recognized": ["Archivada"]}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.chunking.decree_fragment_size, 1200);
        assert_eq!(settings.chunking.interaction_fragment_size, 500);
        assert_eq!(settings.statuses.recognized, vec!["Archivada".to_string()]);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_zero_fragment_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"chunking": {"interactionFragmentSize": 0}}"#).unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::InvalidValue(_)));
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_list_trims_and_drops_blanks() {
        assert_eq!(parse_list(" Archivada, ,Pausada "), vec!["Archivada", "Pausada"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u32_range("8", 1, 64), Some(8));
        assert_eq!(parse_u32_range("0", 1, 64), None);
        assert_eq!(parse_u64_range("600001", 0, 600_000), None);
        assert_eq!(parse_usize_range("abc", 1, 10), None);
        assert_eq!(parse_usize_range("10", 1, 10), Some(10));
    }

    #[test]
    fn paths_live_under_wabun_home() {
        assert!(settings_path().starts_with(wabun_home()));
        assert!(settings_path().ends_with("settings.json"));
    }
}
