//! Vector index error types.
//!
//! These are the collaborator errors the archive propagates verbatim. The
//! `Timeout` and `Cancelled` variants are for remote implementations; the
//! `SQLite` reference index never produces them.

use thiserror::Error;

/// Errors from vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// `SQLite` error (preserves source chain).
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Stored metadata could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Storage operation failed (non-SQLite).
    #[error("Storage failed: {0}")]
    Storage(String),

    /// A fragment id is already present in the collection (or repeated
    /// within one batch).
    #[error("Duplicate fragment id `{id}` in collection `{collection}`")]
    DuplicateId {
        /// Collection name.
        collection: String,
        /// Offending fragment id.
        id: String,
    },

    /// A fragment id addressed by an update does not exist.
    #[error("Fragment `{id}` not found in collection `{collection}`")]
    NotFound {
        /// Collection name.
        collection: String,
        /// Missing fragment id.
        id: String,
    },

    /// The embedding service failed.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The embedding service or index is not ready.
    #[error("Vector index not ready")]
    NotReady,

    /// The operation did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

/// Result alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
