//! `SQLite` backend for the reference vector index.
//!
//! - **[`connection`]**: `r2d2` pool with WAL mode and performance pragmas
//!   applied to every connection.
//! - **[`store`]**: [`SqliteVectorIndex`], one `fragments` table shared by all
//!   collections, brute-force cosine ranking in Rust.

pub mod connection;
pub mod store;

pub use connection::{ConnectionConfig, ConnectionPool, journal_mode, new_file, new_in_memory};
pub use store::SqliteVectorIndex;
