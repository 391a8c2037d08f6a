//! Schema error types.
//!
//! Raised before any index call is made: a record or filter that fails
//! validation never reaches the collaborator.

use thiserror::Error;

/// Errors from record validation and filter composition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Malformed record or metadata (out-of-range importance, unknown enum
    /// value, empty required text, wrong value type).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A filter referenced a field the collection schema does not define.
    #[error("unknown field `{field}` for collection `{collection}`")]
    UnknownField {
        /// The offending field name.
        field: String,
        /// The collection the filter was composed for.
        collection: String,
    },
}

impl SchemaError {
    /// Shorthand for a [`SchemaError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let cases = vec![
            (
                SchemaError::validation("importance 6 out of range"),
                "validation failed: importance 6 out of range",
            ),
            (
                SchemaError::UnknownField {
                    field: "mood".into(),
                    collection: "interactions".into(),
                },
                "unknown field `mood` for collection `interactions`",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaError>();
    }
}
