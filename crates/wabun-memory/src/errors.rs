//! Archive error types.
//!
//! Validation, duplicate and unknown-field failures are raised before the
//! vector index is touched. Index failures (including timeouts and
//! cancellation) are wrapped unchanged in [`ArchiveError::Collaborator`].

use thiserror::Error;
use wabun_core::SchemaError;
use wabun_index::IndexError;

/// Errors from archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Input rejected before any index call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A record with this id (or entity name) already exists.
    #[error("duplicate id `{id}` in collection `{collection}`")]
    DuplicateId {
        /// Collection name.
        collection: String,
        /// Offending record id.
        id: String,
    },

    /// A filter named a field the collection schema does not define.
    #[error("unknown field `{field}` for collection `{collection}`")]
    UnknownField {
        /// Field name.
        field: String,
        /// Collection name.
        collection: String,
    },

    /// No record with this id exists.
    #[error("no record `{id}` in collection `{collection}`")]
    NotFound {
        /// Collection name.
        collection: String,
        /// Missing record id.
        id: String,
    },

    /// The vector index failed; the source is preserved verbatim.
    #[error("vector index error: {0}")]
    Collaborator(#[from] IndexError),

    /// Export file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Export serialization failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ArchiveError {
    /// Shorthand for [`ArchiveError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<SchemaError> for ArchiveError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Validation(msg) => Self::Validation(msg),
            SchemaError::UnknownField { field, collection } => {
                Self::UnknownField { field, collection }
            }
        }
    }
}

/// Result alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::error::Error;

    #[test]
    fn schema_errors_map_to_matching_variants() {
        let err: ArchiveError = SchemaError::validation("importance 6").into();
        assert_matches!(err, ArchiveError::Validation(ref m) if m == "importance 6");

        let err: ArchiveError = SchemaError::UnknownField {
            field: "mood".into(),
            collection: "interactions".into(),
        }
        .into();
        assert_matches!(err, ArchiveError::UnknownField { ref field, .. } if field == "mood");
    }

    #[test]
    fn collaborator_error_keeps_variant_and_source() {
        let err: ArchiveError = IndexError::Timeout("query after 5s".into()).into();
        assert_matches!(err, ArchiveError::Collaborator(IndexError::Timeout(_)));
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("Operation timed out: query after 5s")
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArchiveError>();
    }
}
