//! Branded ID newtypes for type safety.
//!
//! Every record kind in the archive has a distinct ID type implemented as a
//! newtype wrapper around `String`. This prevents accidentally passing a
//! decree ID where an interaction correlation ID is expected.
//!
//! Generated IDs carry a short kind prefix followed by a UUID v7
//! (time-ordered) from [`uuid::Uuid::now_v7`]. Decree IDs are supplied by
//! the caller and never generated.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

macro_rules! generated_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        branded_id! {
            $(#[$meta])*
            $name
        }

        impl $name {
            /// Create a new random ID (`<prefix>_<uuid v7>`).
            #[must_use]
            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::now_v7()))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

generated_id! {
    /// Shared identifier of every fragment produced by one interaction.
    CorrelationId, "int"
}

generated_id! {
    /// Identifier of an entity record.
    EntityId, "ent"
}

generated_id! {
    /// Identifier of a cycle minutes record.
    MinutesId, "min"
}

branded_id! {
    /// Caller-supplied identifier of a decree.
    DecreeId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
