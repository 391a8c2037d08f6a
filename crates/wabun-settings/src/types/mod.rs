//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields keep their compiled defaults.

mod retrieval;

pub use retrieval::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the archive.
///
/// ```json
/// {
///   "chunking": { "decreeFragmentSize": 1200 },
///   "statuses": { "recognized": ["Archivada"] }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WabunSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Storage location and pool sizing.
    pub storage: StorageSettings,
    /// Fragment size bounds.
    pub chunking: ChunkingSettings,
    /// Reference embedder settings.
    pub embedding: EmbeddingSettings,
    /// Result limits of the analytics queries.
    pub queries: QuerySettings,
    /// Context synthesis layout.
    pub synthesis: SynthesisSettings,
    /// Recognized decision statuses beyond the built-in three.
    pub statuses: StatusSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for WabunSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "wabun".to_string(),
            storage: StorageSettings::default(),
            chunking: ChunkingSettings::default(),
            embedding: EmbeddingSettings::default(),
            queries: QuerySettings::default(),
            synthesis: SynthesisSettings::default(),
            statuses: StatusSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl WabunSettings {
    /// Reject values the archive cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.pool_size == 0 {
            return Err(SettingsError::InvalidValue(
                "storage.poolSize must be at least 1".to_string(),
            ));
        }
        let positive = [
            ("chunking.interactionFragmentSize", self.chunking.interaction_fragment_size),
            ("chunking.decreeFragmentSize", self.chunking.decree_fragment_size),
            ("embedding.dimensions", self.embedding.dimensions),
            ("synthesis.charsPerToken", self.synthesis.chars_per_token),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(SettingsError::InvalidValue(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

/// Storage location and connection pool sizing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Archive database path (relative to `~/.wabun` unless absolute).
    pub db_path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: "archive.db".to_string(),
            pool_size: 4,
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageSettings {
    /// Database path resolved against `home`.
    pub fn resolve_db_path(&self, home: &Path) -> PathBuf {
        let path = Path::new(&self.db_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            home.join(path)
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset. Applied by
    /// `Archive::init_logging` in `wabun-memory`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
