//! # wabun-index
//!
//! The vector index collaborator of the Wabun archive.
//!
//! - [`VectorIndex`]: the async trait the archive consumes (batch add,
//!   filtered similarity query, count, get, metadata update)
//! - [`EmbeddingService`]: pluggable text embedder, with the deterministic
//!   [`HashEmbeddingService`]
//! - [`SqliteVectorIndex`]: reference implementation over an `r2d2` `SQLite`
//!   pool; brute-force KNN with cosine distance
//!
//! ## Crate Position
//!
//! Depends on `wabun-core` for collection names, metadata maps and filter
//! predicates. Depended on by `wabun-memory`.

#![deny(unsafe_code)]

pub mod embedding;
pub mod errors;
pub mod index;
pub mod normalize;
pub mod sqlite;

pub use embedding::{EmbeddingService, HashEmbeddingService};
pub use errors::{IndexError, Result};
pub use index::{FragmentBatch, QueryHit, VectorIndex};
pub use sqlite::{ConnectionConfig, SqliteVectorIndex};
